//! Register dump printed by `info reg` between the register markers.
use crate::constants::*;
use crate::error::*;
use crate::record::Register;
use crate::transcript::{parse_hex, Transcript};

/// Extract registers in print order
///
/// ```text
/// <REG>
/// rax            0x0	0
/// rcx            0xffffffffffffffff	-1
/// eflags         0x206	[ PF IF ]
/// </REG>
/// ```
pub fn extract_registers(transcript: &Transcript) -> Result<Vec<Register>> {
    let mut cursor = transcript.cursor();
    cursor.advance_to(REG_START)?;

    let mut registers = Vec::with_capacity(24);
    loop {
        let Some(line) = cursor.next_line() else {
            return Err(transcript.malformed(format!("no {REG_END} after register dump")));
        };
        if line == REG_END {
            break;
        }
        let mut fields = line.split_whitespace();
        let (Some(name), Some(value)) = (fields.next(), fields.next()) else {
            return Err(transcript.malformed(format!("bad register line: {line:?}")));
        };
        let Some(value) = parse_hex(value) else {
            return Err(transcript.malformed(format!("bad value of register {name}: {value:?}")));
        };
        registers.push(Register {
            name: name.to_string(),
            value,
        });
    }

    Ok(registers)
}
