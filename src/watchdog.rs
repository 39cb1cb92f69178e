//! Timeout for the debugger process and its whole process tree.
//!
//! gdb puts the inferior into a process group of its own, so killing the
//! debugger group is not enough: the tree is collected from `/proc` first and
//! every descendant and its group are killed as well.
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::process::Child;
use std::time::Duration;

use log::{debug, warn};
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::{getpgrp, Pid};
use wait_timeout::ChildExt;

/// Wait for `child` at most `timeout` seconds, kill its process tree on expiry.
///
/// The child must have been spawned as a process group leader. It is left
/// unreaped, the caller still has to `wait()` for it.
///
/// # Arguments
///
/// * `child` - debugger process
///
/// * `timeout` - timeout in seconds, 0 means wait forever
///
/// # Return value
///
/// `true` if the timeout expired and the tree was killed
pub fn wait_or_kill(child: &mut Child, timeout: u64) -> io::Result<bool> {
    if timeout == 0 {
        child.wait()?;
        return Ok(false);
    }
    if child.wait_timeout(Duration::from_secs(timeout))?.is_some() {
        return Ok(false);
    }
    // Not reaped yet, so the pid and the group id still belong to the child.
    kill_tree(child.id());
    warn!("Killed by timer after {}s: process {}", timeout, child.id());
    Ok(true)
}

/// Process ids and process groups of all descendants of `root`.
fn descendants(root: i32) -> Vec<(Pid, Pid)> {
    let Ok(entries) = fs::read_dir("/proc") else {
        return Vec::new();
    };
    // (pid, ppid, pgrp)
    let table: Vec<(i32, i32, i32)> = entries
        .flatten()
        .filter_map(|entry| {
            let pid = entry.file_name().to_str()?.parse::<i32>().ok()?;
            let stat = fs::read_to_string(entry.path().join("stat")).ok()?;
            // comm may contain spaces and parentheses.
            let mut fields = stat.get(stat.rfind(')')? + 1..)?.split_whitespace();
            let ppid = fields.nth(1)?.parse().ok()?;
            let pgrp = fields.next()?.parse().ok()?;
            Some((pid, ppid, pgrp))
        })
        .collect();

    let mut found = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(parent) = queue.pop_front() {
        for &(pid, ppid, pgrp) in &table {
            if ppid == parent && !found.iter().any(|&(p, _)| p == Pid::from_raw(pid)) {
                found.push((Pid::from_raw(pid), Pid::from_raw(pgrp)));
                queue.push_back(pid);
            }
        }
    }
    found
}

/// Send `SIGKILL` to process group `pid` and to every process below it.
pub fn kill_tree(pid: u32) {
    let root = Pid::from_raw(pid as i32);
    // Collect before killing, orphans are reparented to init.
    let tree = descendants(root.as_raw());

    let own = getpgrp();
    let mut groups = vec![root];
    for &(_, pgrp) in &tree {
        if pgrp != own && !groups.contains(&pgrp) {
            groups.push(pgrp);
        }
    }
    for group in groups {
        if let Err(err) = killpg(group, Signal::SIGKILL) {
            debug!("Couldn't kill process group {}: {}", group, err);
        }
    }
    for (pid, _) in tree {
        if let Err(err) = kill(pid, Signal::SIGKILL) {
            debug!("Couldn't kill process {}: {}", pid, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::CommandExt;
    use std::process::{Command, Stdio};
    use std::time::Instant;

    #[test]
    fn test_no_timeout() {
        let mut child = Command::new("true").process_group(0).spawn().unwrap();
        assert!(!wait_or_kill(&mut child, 0).unwrap());
    }

    #[test]
    fn test_kills_group() {
        let mut child = Command::new("sh")
            .args(["-c", "sleep 30 & wait"])
            .process_group(0)
            .spawn()
            .unwrap();
        let start = Instant::now();
        assert!(wait_or_kill(&mut child, 1).unwrap());
        let status = child.wait().unwrap();

        assert!(!status.success());
        assert!(start.elapsed() < Duration::from_secs(20));
    }

    #[test]
    fn test_kills_detached_descendants() {
        // The grandchild runs in a session of its own and holds stdout open.
        let mut child = Command::new("sh")
            .args(["-c", "setsid sleep 30; true"])
            .stdout(Stdio::piped())
            .process_group(0)
            .spawn()
            .unwrap();
        let mut stdout = child.stdout.take().unwrap();
        let start = Instant::now();
        assert!(wait_or_kill(&mut child, 1).unwrap());
        child.wait().unwrap();

        let mut output = Vec::new();
        io::Read::read_to_end(&mut stdout, &mut output).unwrap();
        assert!(start.elapsed() < Duration::from_secs(20));
    }

    #[test]
    fn test_finished_before_timeout() {
        let mut child = Command::new("true").process_group(0).spawn().unwrap();
        let start = Instant::now();
        assert!(!wait_or_kill(&mut child, 30).unwrap());
        assert!(child.wait().unwrap().success());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_descendants() {
        let mut child = Command::new("sh")
            .args(["-c", "sleep 30 & wait"])
            .process_group(0)
            .spawn()
            .unwrap();
        // Give the shell time to fork.
        std::thread::sleep(Duration::from_millis(500));
        let tree = descendants(child.id() as i32);
        kill_tree(child.id());
        child.wait().unwrap();

        assert!(!tree.is_empty());
        assert!(tree
            .iter()
            .all(|&(_, pgrp)| pgrp == Pid::from_raw(child.id() as i32)));
    }
}
