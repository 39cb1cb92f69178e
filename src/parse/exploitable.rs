//! Sections of the verbose exploitable report: faulting frame, annotations,
//! hash and classification.
use crate::constants::*;
use crate::error::*;
use crate::record::StackEntry;
use crate::transcript::{parse_hex, Transcript};

use super::frame::FrameLine;

/// Classifier verdict.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub faulting_frame: StackEntry,
    pub hash: String,
    pub classification: String,
    /// Description, short description and explanation lines.
    pub extra: Vec<String>,
}

/// Extract the classifier verdict
///
/// ```text
/// Faulting frame: #  4 None at 0x7ffff6fad93b in /usr/lib/x86_64-linux-gnu/libcairo.so.2.11301.0
/// Description: Abort signal
/// Short description: AbortSignal (20/22)
/// Hash: 71c14ffe39944b60af6fd47d1e505f97.0822ff5e99ce7ad4a1e6e98b273082a7
/// Exploitability Classification: UNKNOWN
/// Explanation: The target is stopped on a SIGABRT. [...]
/// ```
pub fn extract_verdict(transcript: &Transcript) -> Result<Verdict> {
    let mut cursor = transcript.cursor();
    let mut verdict = Verdict::default();

    let line = cursor.advance_to(FAULTING_FRAME)?;
    verdict.faulting_frame = faulting_frame(transcript, line)?;

    verdict.extra.push(cursor.expect(DESCRIPTION)?.to_string());
    verdict
        .extra
        .push(cursor.expect(SHORT_DESCRIPTION)?.to_string());

    let line = cursor.advance_to(HASH)?;
    verdict.hash = field(transcript, line, 1)?;

    let line = cursor.advance_to(EXPLOITABILITY)?;
    verdict.classification = field(transcript, line, 2)?;

    verdict.extra.push(cursor.expect(EXPLANATION)?.to_string());

    Ok(verdict)
}

fn faulting_frame(transcript: &Transcript, line: &str) -> Result<StackEntry> {
    let body = line.trim_start_matches(FAULTING_FRAME);
    let Some(layout) = FrameLine::classify(body).and_then(|frame| frame.layout()) else {
        return Err(transcript.malformed(format!("couldn't parse faulting frame: {line:?}")));
    };
    if layout.module.is_empty() {
        return Err(transcript.malformed(format!("no module in faulting frame: {line:?}")));
    }
    let Some(address) = parse_hex(layout.address) else {
        return Err(transcript.malformed(format!(
            "bad address {:?} in faulting frame",
            layout.address
        )));
    };
    Ok(StackEntry {
        symbol: layout.symbol,
        address,
        module: layout.module,
    })
}

fn field(transcript: &Transcript, line: &str, index: usize) -> Result<String> {
    line.split_whitespace()
        .nth(index)
        .map(str::to_string)
        .ok_or_else(|| transcript.malformed(format!("no field {index} in line {line:?}")))
}
