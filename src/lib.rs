//! # gdbcrash
//! gdbcrash reproduces a crash of a target program on one candidate input under
//! gdb and turns the transcript of the debugger session into a structured
//! `CrashRecord`.
//!
//! gdb runs in batch mode with a fixed script that starts the target, sources
//! the exploitable extension and prints its verbose report and a register dump
//! between text markers. The target may be confined with an address space limit
//! and the whole debugger process tree is killed when a timeout expires.
//!
//! Running a candidate has three outcomes:
//!
//! * `Ok(Some(record))` - the candidate crashes the target
//! * `Ok(None)` - no crash detected
//! * `Err(error)` - gdb couldn't be launched, or its output couldn't be parsed

pub mod constants;
pub mod error;
pub mod invocation;
pub mod parse;
pub mod record;
pub mod report;
pub mod run;
pub mod transcript;
pub mod util;
pub mod watchdog;

// This macro merges all [&str] slices into single Vec<String>.
#[macro_export]
macro_rules! concatall {
    ( $( $x:expr ),* ) => {
        {
            [$(&$x[..],)*].concat().iter().map(|x| x.to_string()).collect::<Vec<String>>()

        }
    };
}
