//! Transcript triage and a forward-only line cursor for the section extractors.
use std::str::Lines;

use regex::Regex;

use crate::constants::*;
use crate::error::*;

lazy_static::lazy_static! {
    static ref HEX_TOKEN: Regex = Regex::new(r"^0[xX]([0-9a-fA-F]{1,16})$").unwrap();
}

/// Find the part of gdb output worth parsing
///
/// # Arguments
///
/// * `raw` - complete gdb stdout
///
/// # Return value
///
/// Output starting at the exploitable marker, or `None` if the target didn't crash
pub fn locate(raw: &[u8]) -> Option<&[u8]> {
    if raw.is_empty() || find(raw, EMPTY_REGISTERS.as_bytes()).is_some() {
        return None;
    }
    // Target output printed before the marker may contain arbitrarily long lines.
    find(raw, EXPLOITABLE_START.as_bytes()).map(|start| &raw[start..])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse `0x`-prefixed hexadecimal number.
pub fn parse_hex(token: &str) -> Option<u64> {
    let caps = HEX_TOKEN.captures(token)?;
    u64::from_str_radix(caps.get(1)?.as_str(), 16).ok()
}

/// Debugger transcript together with the command that produced it.
pub struct Transcript<'a> {
    text: &'a str,
    command: &'a str,
}

impl<'a> Transcript<'a> {
    pub fn new(text: &'a str, command: &'a str) -> Self {
        Transcript { text, command }
    }

    /// Start scanning from the first line.
    pub fn cursor(&self) -> Cursor<'_, 'a> {
        Cursor {
            transcript: self,
            lines: self.text.lines(),
        }
    }

    /// Fatal parse error carrying the whole transcript and command line.
    pub fn malformed(&self, reason: impl Into<String>) -> Error {
        ParseFailure {
            reason: reason.into(),
            transcript: self.text.to_string(),
            command: self.command.to_string(),
        }
        .into()
    }
}

/// Forward-only position in a transcript.
pub struct Cursor<'t, 'a> {
    transcript: &'t Transcript<'a>,
    lines: Lines<'a>,
}

impl<'t, 'a> Cursor<'t, 'a> {
    pub fn next_line(&mut self) -> Option<&'a str> {
        self.lines.next()
    }

    /// Skip to the next line starting with `prefix`, `None` at the end of transcript.
    pub fn seek(&mut self, prefix: &str) -> Option<&'a str> {
        self.lines.by_ref().find(|line| line.starts_with(prefix))
    }

    /// Skip to the next line starting with `prefix`.
    pub fn advance_to(&mut self, prefix: &str) -> Result<&'a str> {
        self.seek(prefix)
            .ok_or_else(|| self.transcript.malformed(format!("no line starting with {prefix:?}")))
    }

    /// Take exactly the next line, which must start with `prefix`.
    pub fn expect(&mut self, prefix: &str) -> Result<&'a str> {
        match self.lines.next() {
            Some(line) if line.starts_with(prefix) => Ok(line),
            Some(line) => Err(self
                .transcript
                .malformed(format!("expected line starting with {prefix:?}, got {line:?}"))),
            None => Err(self.transcript.malformed(format!(
                "transcript ended, expected line starting with {prefix:?}"
            ))),
        }
    }
}
