//! Invocation builder: gdb batch script and argument vector for one candidate.
use std::path::Path;

use crate::concatall;
use crate::constants::*;

/// How gdb is started.
#[derive(Clone, Debug)]
pub struct GdbConfig {
    /// Debugger program.
    pub program: String,
    /// Options preceding the batch script.
    pub flags: Vec<String>,
    /// Path to the exploitable extension sourced inside the session.
    pub exploitable: String,
}

impl Default for GdbConfig {
    fn default() -> Self {
        GdbConfig {
            program: GDB.to_string(),
            flags: concatall!(GDB_FLAGS),
            exploitable: DEFAULT_EXPLOITABLE.to_string(),
        }
    }
}

impl GdbConfig {
    /// Commands executed inside the gdb session, in order.
    pub fn batch_script(&self) -> Vec<String> {
        vec![
            "run".to_string(),
            format!("source {}", self.exploitable),
            format!("echo {EXPLOITABLE_START}\\n"),
            "exploitable -v".to_string(),
            format!("echo {EXPLOITABLE_END}\\n"),
            format!("echo {REG_START}\\n"),
            "info reg".to_string(),
            format!("echo {REG_END}\\n"),
            "quit".to_string(),
        ]
    }
}

/// Arguments for one debugger run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Debugger options, batch script and the trailing `--args`.
    pub debugger_args: Vec<String>,
    /// Target command line after placeholder substitution.
    pub target: Vec<String>,
    /// Number of replaced placeholders.
    pub substitutions: usize,
}

impl Invocation {
    /// Build debugger arguments for running `command` on `candidate`
    ///
    /// # Arguments
    ///
    /// * `config` - debugger configuration
    ///
    /// * `command` - target program and its arguments, may contain `@@`
    ///
    /// * `candidate` - path to the input file
    pub fn new(config: &GdbConfig, command: &[String], candidate: &Path) -> Self {
        let mut debugger_args = config.flags.clone();
        for line in config.batch_script() {
            debugger_args.push("--ex".to_string());
            debugger_args.push(line);
        }
        debugger_args.push(GDB_ARGS.to_string());

        let path = candidate.display().to_string();
        let mut substitutions = 0;
        let target = command
            .iter()
            .map(|arg| {
                let count = arg.matches(FILENAME_PLACEHOLDER).count();
                if count == 0 {
                    return arg.clone();
                }
                substitutions += count;
                arg.replace(FILENAME_PLACEHOLDER, &path)
            })
            .collect();

        Invocation {
            debugger_args,
            target,
            substitutions,
        }
    }

    /// Without a placeholder the target expects the candidate on its stdin.
    pub fn reads_stdin(&self) -> bool {
        self.substitutions == 0
    }
}
