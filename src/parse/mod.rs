//! Parser turning the transcript of a gdb session into a `CrashRecord`.
//!
//! Every section extractor scans the transcript from the beginning on its own,
//! so the relative order of the sections in gdb output doesn't matter. Any
//! deviation from the expected layout fails the whole parse with the
//! transcript and the command line attached; a partially filled record is
//! never returned.
pub mod disasm;
pub mod exploitable;
pub mod frame;
pub mod registers;
pub mod stack;

use crate::error::*;
use crate::record::CrashRecord;
use crate::transcript::Transcript;

/// Parse gdb output
///
/// # Arguments
///
/// * `raw` - gdb output starting at the exploitable marker
///
/// * `command` - gdb command line, attached to parse errors
///
/// # Return value
///
/// Crash record with all sections filled
pub fn parse(raw: &[u8], command: &str) -> Result<CrashRecord> {
    let text = String::from_utf8_lossy(raw);
    let transcript = Transcript::new(&text, command);

    let registers = registers::extract_registers(&transcript)?;
    let stack = stack::extract_stack(&transcript)?;
    let verdict = exploitable::extract_verdict(&transcript)?;
    let (faulting_instruction, disassembly) = disasm::extract_disassembly(&transcript)?;

    Ok(CrashRecord {
        faulting_frame: verdict.faulting_frame,
        stack,
        registers,
        faulting_instruction,
        disassembly,
        hash: verdict.hash,
        classification: verdict.classification,
        extra: verdict.extra,
    })
}
