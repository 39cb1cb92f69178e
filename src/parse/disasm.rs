//! "Nearby code:" block of the exploitable report.
use crate::constants::*;
use crate::error::*;
use crate::record::Instruction;
use crate::transcript::{parse_hex, Transcript};

/// Line of the nearby code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeLine<'a> {
    /// `=> 0x00007ffff6171e37 <+55>:\tcmp    rax,0xfffffffffffff000`
    Fault { address: &'a str, text: String },
    /// `   0x00007ffff6171e27 <+39>:\tmovsxd rdx,edi`
    Plain { address: &'a str, text: String },
    /// Anything gdb interleaves, e.g. `Dump of assembler code for function ...`
    Noise,
}

impl<'a> CodeLine<'a> {
    /// Classify one line, `None` if it looks like an instruction but is truncated.
    pub fn classify(line: &'a str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.first() {
            Some(&FAULT_MARKER) => {
                if fields.len() < 3 {
                    return None;
                }
                Some(CodeLine::Fault {
                    address: fields[1],
                    text: fields[3..].join(" "),
                })
            }
            Some(first) if first.starts_with(HEX_PREFIX) => {
                if fields.len() < 2 {
                    return None;
                }
                Some(CodeLine::Plain {
                    address: fields[0],
                    text: fields[2..].join(" "),
                })
            }
            _ => Some(CodeLine::Noise),
        }
    }
}

/// Extract the faulting instruction and the disassembly around it.
pub fn extract_disassembly(
    transcript: &Transcript,
) -> Result<(Option<Instruction>, Vec<Instruction>)> {
    let mut cursor = transcript.cursor();
    cursor.advance_to(NEARBY_CODE)?;

    let mut fault = None;
    let mut disassembly = Vec::new();
    while let Some(line) = cursor.next_line() {
        if line.starts_with(STACK_TRACE) {
            break;
        }
        let Some(code) = CodeLine::classify(line) else {
            return Err(transcript.malformed(format!("truncated instruction line: {line:?}")));
        };
        let (address, text, is_fault) = match code {
            CodeLine::Noise => continue,
            CodeLine::Fault { address, text } => (address, text, true),
            CodeLine::Plain { address, text } => (address, text, false),
        };
        let Some(address) = parse_hex(address) else {
            return Err(transcript.malformed(format!("bad instruction address in line {line:?}")));
        };
        let insn = Instruction { address, text };
        if is_fault {
            if fault.is_some() {
                return Err(transcript.malformed(format!("second faulting instruction: {line:?}")));
            }
            fault = Some(insn.clone());
        }
        disassembly.push(insn);
    }

    if let Some(fault) = &fault {
        let hits = disassembly
            .iter()
            .filter(|insn| insn.address == fault.address)
            .count();
        if hits > 1 {
            return Err(transcript.malformed(format!(
                "{hits} instructions at faulting address {:#x}",
                fault.address
            )));
        }
    }

    Ok((fault, disassembly))
}
