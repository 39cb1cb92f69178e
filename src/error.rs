//! A custom gdbcrash error.
use std::fmt;
use std::io;
use std::result;

use thiserror::Error;

#[derive(Error, Debug)]
/// A custom gdbcrash error
pub enum Error {
    /// Debugger couldn't be started or fed with the candidate file
    Launch(String, io::Error),
    /// Debugger output doesn't have the expected layout
    Parse(Box<ParseFailure>),
}

/// Everything needed to find out why a transcript couldn't be parsed.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    /// Violated expectation.
    pub reason: String,
    /// Raw transcript starting at the exploitable marker.
    pub transcript: String,
    /// Exact debugger command line.
    pub command: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "BUG: Internal error parsing gdb output: {}", self.reason)?;
        writeln!(f)?;
        writeln!(
            f,
            "The gdb transcript doesn't match the layout the parser expects, so no \
             crash record is produced for it. Either gdb or the exploitable extension \
             changed its output format, or the parser is wrong about it."
        )?;
        writeln!(f)?;
        writeln!(f, "GDB OUTPUT:")?;
        writeln!(f)?;
        writeln!(f, "{}", self.transcript)?;
        writeln!(f, "COMMAND:")?;
        write!(f, "{}", self.command)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Launch(ref msg, ref err) => write!(f, "{msg}: {err}"),
            Error::Parse(ref failure) => write!(f, "{failure}"),
        }
    }
}

impl From<ParseFailure> for Error {
    fn from(failure: ParseFailure) -> Error {
        Error::Parse(Box::new(failure))
    }
}

pub type Result<T> = result::Result<T, Error>;
