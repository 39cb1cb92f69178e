//! "Stack trace:" block of the exploitable report.
use crate::constants::*;
use crate::error::*;
use crate::record::StackEntry;
use crate::transcript::{parse_hex, Transcript};

use super::frame::FrameLine;

/// Extract stack frames, innermost first.
///
/// A report without a stack trace yields an empty stack: some crashes leave
/// registers that gdb can't unwind from.
pub fn extract_stack(transcript: &Transcript) -> Result<Vec<StackEntry>> {
    let mut cursor = transcript.cursor();
    if cursor.seek(STACK_TRACE).is_none() {
        return Ok(Vec::new());
    }

    let mut stack = Vec::new();
    while let Some(line) = cursor.next_line() {
        if !line.starts_with(FRAME_MARKER) {
            break;
        }
        let Some(layout) = FrameLine::classify(line).and_then(|frame| frame.layout()) else {
            return Err(transcript.malformed(format!("couldn't parse stack frame: {line:?}")));
        };
        // Address column moves when gdb prints negative decimal values next to hex.
        let Some(address) = line
            .split_whitespace()
            .find(|field| field.starts_with(HEX_PREFIX))
        else {
            return Err(transcript.malformed(format!("no address in stack frame: {line:?}")));
        };
        let Some(address) = parse_hex(address) else {
            return Err(transcript.malformed(format!("bad address in stack frame: {line:?}")));
        };
        stack.push(StackEntry {
            symbol: layout.symbol,
            address,
            module: layout.module,
        });
    }

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack() {
        let trace = "Nearby code:\n\
Stack trace:\n\
#  0 __GI_raise at 0x7ffff6171e37 in /lib/x86_64-linux-gnu/libc-2.19.so (BL)\n\
# 99 Gfx::go at 0x48551a in /home/ben/src/poppler-0.26.5/utils/pdftocairo\n\
#100 Parser::getObj at 0x56997b in /home/ben/src/poppler-0.26.5/utils/pdftocairo\n\
#101 operator new(unsigned long) at 0x7ffff6d87698 in /usr/lib/x86_64-linux-gnu/libstdc++.so.6.0.20\n\
Faulting frame: #  0 __GI_raise at 0x7ffff6171e37 in /lib/x86_64-linux-gnu/libc-2.19.so\n";
        let transcript = Transcript::new(trace, "gdb");
        let stack = extract_stack(&transcript).unwrap();

        assert_eq!(stack.len(), 4);
        assert_eq!(stack[0].symbol, "__GI_raise");
        assert_eq!(stack[0].address, 0x7ffff6171e37);
        assert_eq!(stack[0].module, "/lib/x86_64-linux-gnu/libc-2.19.so (BL)");
        assert_eq!(stack[1].symbol, "Gfx::go");
        assert_eq!(stack[2].symbol, "Parser::getObj");
        assert_eq!(stack[2].address, 0x56997b);
        assert_eq!(stack[1].module, stack[2].module);
        assert_eq!(stack[3].symbol, "operator new(unsigned long)");
        assert_eq!(
            stack[3].module,
            "/usr/lib/x86_64-linux-gnu/libstdc++.so.6.0.20"
        );
    }

    #[test]
    fn test_stack_missing() {
        let transcript = Transcript::new("<EXPLOITABLE>\nHash: 1.2\n</EXPLOITABLE>\n", "gdb");
        assert!(extract_stack(&transcript).unwrap().is_empty());

        let transcript = Transcript::new("Stack trace:\nFaulting frame: #  0 ...\n", "gdb");
        assert!(extract_stack(&transcript).unwrap().is_empty());
    }

    #[test]
    fn test_stack_malformed() {
        for trace in [
            "Stack trace:\n#  0 __GI_raise at 7ffff6171e37 in /lib/libc.so\n",
            "Stack trace:\n#  0 __GI_raise in /lib/libc.so\n",
            "Stack trace:\n#  0 __GI_raise at 0xzz in /lib/libc.so\n",
            "Stack trace:\n#x\n",
        ] {
            let transcript = Transcript::new(trace, "gdb");
            assert!(
                matches!(extract_stack(&transcript), Err(Error::Parse(_))),
                "{trace}"
            );
        }
    }
}
