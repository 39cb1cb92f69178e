//! Runs the target under gdb on one candidate and parses the transcript.
use std::fs::File;
use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;

use log::{debug, info, warn};

use crate::concatall;
use crate::error::*;
use crate::invocation::{GdbConfig, Invocation};
use crate::parse;
use crate::record::CrashRecord;
use crate::transcript;
use crate::watchdog;

/// Reproduce a crash under a debugger.
pub trait Debugger {
    /// Run target on a candidate file
    ///
    /// # Arguments
    ///
    /// * `command` - target program and its arguments, `@@` is replaced by `candidate`
    ///
    /// * `candidate` - input file, fed to stdin if `command` has no placeholder
    ///
    /// * `memlimit` - address space limit for the target in kilobytes, 0 for none
    ///
    /// * `timeout` - timeout in seconds, 0 for none
    ///
    /// # Return value
    ///
    /// Crash record, or `None` if the target didn't crash
    fn run(
        &self,
        command: &[String],
        candidate: &Path,
        memlimit: u64,
        timeout: u64,
    ) -> Result<Option<CrashRecord>>;
}

/// Drives gdb with the exploitable extension.
#[derive(Clone, Debug, Default)]
pub struct GdbEngine {
    pub config: GdbConfig,
}

impl GdbEngine {
    pub fn new(config: GdbConfig) -> Self {
        GdbEngine { config }
    }
}

/// Make the target run with limited address space.
///
/// The limit must not apply to gdb itself, so gdb runs a shell that sets the
/// limit and then replaces itself with the target.
pub fn limit_memory(target: &[String], memlimit: u64) -> Vec<String> {
    if memlimit == 0 {
        return target.to_vec();
    }
    // $0 is the target program, $@ are its arguments.
    let prelude = format!("ulimit -Sv {memlimit} && exec \"$0\" \"$@\"");
    let mut argv = concatall!(["bash", "-c"], [prelude.as_str()]);
    argv.extend_from_slice(target);
    argv
}

fn launch_error(msg: impl Into<String>) -> impl FnOnce(io::Error) -> Error {
    move |err| Error::Launch(msg.into(), err)
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl Debugger for GdbEngine {
    fn run(
        &self,
        command: &[String],
        candidate: &Path,
        memlimit: u64,
        timeout: u64,
    ) -> Result<Option<CrashRecord>> {
        let invocation = Invocation::new(&self.config, command, candidate);
        let mut args = invocation.debugger_args.clone();
        args.extend(limit_memory(&invocation.target, memlimit));
        let cmd_line = std::iter::once(self.config.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<&str>>()
            .join(" ");
        debug!("{}", cmd_line);

        let input = if invocation.reads_stdin() {
            Some(File::open(candidate).map_err(launch_error(format!(
                "Couldn't open {} for target stdin",
                candidate.display()
            )))?)
        } else {
            None
        };

        let mut cmd = Command::new(&self.config.program);
        cmd.args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            // Group leader, so a timeout can kill gdb together with the target tree.
            .process_group(0);
        let mut child = cmd
            .spawn()
            .map_err(launch_error(format!("Couldn't launch {}", self.config.program)))?;

        let Some(mut stdout) = child.stdout.take() else {
            reap(&mut child);
            return Err(Error::Launch(
                "Couldn't capture gdb stdout".to_string(),
                io::Error::from(io::ErrorKind::BrokenPipe),
            ));
        };
        let reader = thread::spawn(move || {
            let mut output = Vec::new();
            stdout.read_to_end(&mut output).map(|_| output)
        });

        let writer = if let Some(mut input) = input {
            let Some(mut stdin) = child.stdin.take() else {
                reap(&mut child);
                let _ = reader.join();
                return Err(Error::Launch(
                    "Couldn't open gdb stdin".to_string(),
                    io::Error::from(io::ErrorKind::BrokenPipe),
                ));
            };
            let name = candidate.display().to_string();
            // Dropping stdin at the end signals end of input to the target.
            Some(thread::spawn(move || {
                if let Err(err) = io::copy(&mut input, &mut stdin) {
                    warn!("Couldn't write {} to target stdin: {}", name, err);
                }
            }))
        } else {
            None
        };

        // Exit status is meaningless, markers in the output tell what happened.
        match watchdog::wait_or_kill(&mut child, timeout) {
            Ok(true) => info!("Timeout on {}", candidate.display()),
            Ok(false) => {}
            Err(err) => {
                warn!("Couldn't wait for gdb: {}", err);
                watchdog::kill_tree(child.id());
            }
        }
        match child.wait() {
            Ok(status) => debug!("gdb exited: {}", status),
            Err(err) => warn!("Couldn't wait for gdb: {}", err),
        }
        if let Some(writer) = writer {
            let _ = writer.join();
        }
        let output = match reader.join() {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                warn!("Couldn't read gdb output: {}", err);
                Vec::new()
            }
            Err(_) => {
                warn!("gdb output reader panicked");
                Vec::new()
            }
        };

        let Some(raw) = transcript::locate(&output) else {
            debug!("No crash on {}", candidate.display());
            return Ok(None);
        };
        parse::parse(raw, &cmd_line).map(Some)
    }
}
