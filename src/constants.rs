//! Literals shared by the invocation builder and the transcript parser.

/// Default debugger program.
pub const GDB: &str = "gdb";
/// Quiet non-interactive batch mode.
pub const GDB_FLAGS: [&str; 2] = ["-q", "--batch"];
/// Separates debugger options from the inferior command line.
pub const GDB_ARGS: &str = "--args";
/// Default location of the exploitable gdb extension.
pub const DEFAULT_EXPLOITABLE: &str = "~/src/exploitable/exploitable/exploitable.py";

/// Placeholder in target arguments that is replaced by the candidate path.
pub const FILENAME_PLACEHOLDER: &str = "@@";

pub const EXPLOITABLE_START: &str = "<EXPLOITABLE>";
pub const EXPLOITABLE_END: &str = "</EXPLOITABLE>";
pub const REG_START: &str = "<REG>";
pub const REG_END: &str = "</REG>";
/// Register dump of a target that exited without crashing.
pub const EMPTY_REGISTERS: &str = "<REG>\n</REG>";

pub const FAULTING_FRAME: &str = "Faulting frame:";
pub const DESCRIPTION: &str = "Description:";
pub const SHORT_DESCRIPTION: &str = "Short description:";
pub const HASH: &str = "Hash:";
pub const EXPLOITABILITY: &str = "Exploitability";
pub const EXPLANATION: &str = "Explanation:";
pub const NEARBY_CODE: &str = "Nearby code:";
pub const STACK_TRACE: &str = "Stack trace:";

/// Marks the instruction at the program counter in disassembly.
pub const FAULT_MARKER: &str = "=>";
/// Starts every stack frame line.
pub const FRAME_MARKER: &str = "#";
pub const HEX_PREFIX: &str = "0x";
