//! Report contains `CrashReport`, a crash record together with what is needed to reproduce it.
use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::record::CrashRecord;

/// Crash record with reproduction context.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct CrashReport {
    /// Date and time of the report in RFC 3339 format.
    #[serde(rename = "Date")]
    #[serde(default)]
    pub date: String,
    /// Target command line with the filename placeholder intact.
    #[serde(rename = "Command")]
    #[serde(default)]
    pub command: Vec<String>,
    /// Candidate file that reproduces the crash.
    #[serde(rename = "Candidate")]
    #[serde(default)]
    pub candidate: String,
    #[serde(flatten)]
    pub crash: CrashRecord,
}

impl CrashReport {
    /// Create new `CrashReport` dated now
    pub fn new(command: &[String], candidate: &Path, crash: CrashRecord) -> Self {
        let local: DateTime<Local> = Local::now();
        CrashReport {
            date: local.to_rfc3339_opts(SecondsFormat::Micros, false),
            command: command.to_vec(),
            candidate: candidate.display().to_string(),
            crash,
        }
    }
}

impl fmt::Display for CrashReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.date.is_empty() {
            writeln!(f, "Date: {}", self.date)?;
        }
        if !self.command.is_empty() {
            writeln!(f, "Command: {}", self.command.join(" "))?;
        }
        if !self.candidate.is_empty() {
            writeln!(f, "Candidate: {}", self.candidate)?;
        }
        write!(f, "\n{}", self.crash)
    }
}
