extern crate lazy_static;
extern crate serde_json;

use gdbcrash::constants::FILENAME_PLACEHOLDER;
use gdbcrash::error::Error;
use gdbcrash::invocation::GdbConfig;
use gdbcrash::run::{Debugger, GdbEngine};

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::RwLock;
use std::time::{Duration, Instant};

lazy_static::lazy_static! {
    pub static ref EXE_DIR: RwLock<PathBuf> = RwLock::new( match std::env::current_exe() {
        Ok(cur_exe) => match cur_exe.parent() {
                    Some(cur_dir) => {
                                    match cur_dir.parent() {
                                        Some(parent) => parent.to_path_buf(),
                                        None =>  PathBuf::from(".."),
                                    }
                                    },
                    None => PathBuf::from(".."),
                   }
        Err(_) => PathBuf::from(".."),
    });
}

const FAKE_GDB: &str = "tests/gdbcrash_tests/fake-gdb.sh";
const ABORT: &str = "tests/gdbcrash_tests/abort.txt";

fn abs_path(rpath: &str) -> String {
    let path = Path::new(rpath);
    path.canonicalize().unwrap().to_str().unwrap().to_string()
}

/// Engine running the stand-in debugger in `mode`.
fn fake_engine(mode: &str) -> GdbEngine {
    GdbEngine::new(GdbConfig {
        program: "sh".to_string(),
        flags: vec![
            abs_path(FAKE_GDB),
            mode.to_string(),
            "-q".to_string(),
            "--batch".to_string(),
        ],
        exploitable: "/opt/exploitable/exploitable.py".to_string(),
    })
}

fn command(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_crash_from_transcript() {
    let engine = fake_engine(&abs_path(ABORT));
    let record = engine
        .run(&command(&["./pdftocairo", "@@"]), Path::new(ABORT), 0, 0)
        .unwrap()
        .expect("crash expected");

    assert_eq!(record.faulting_frame.symbol, "None");
    assert_eq!(record.faulting_frame.address, 0x7ffff6fad93b);
    assert_eq!(
        record.faulting_frame.module,
        "/usr/lib/x86_64-linux-gnu/libcairo.so.2.11301.0"
    );
    assert_eq!(
        record.hash,
        "71c14ffe39944b60af6fd47d1e505f97.0822ff5e99ce7ad4a1e6e98b273082a7"
    );
    assert_eq!(record.classification, "UNKNOWN");
    assert_eq!(record.stack.len(), 22);
    assert_eq!(record.registers.len(), 24);
}

#[test]
fn test_candidate_via_stdin() {
    let engine = fake_engine("stdin");
    let record = engine
        .run(&command(&["./xmllint", "-"]), Path::new(ABORT), 0, 0)
        .unwrap()
        .expect("crash expected");
    assert_eq!(record.classification, "UNKNOWN");
}

#[test]
fn test_candidate_via_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let candidate = dir.path().join("id:000000,sig:06");
    fs::copy(ABORT, &candidate).unwrap();

    let engine = fake_engine("last-arg");
    let target = command(&["./pdftocairo", "-png", FILENAME_PLACEHOLDER]);
    let record = engine
        .run(&target, &candidate, 0, 0)
        .unwrap()
        .expect("crash expected");
    assert_eq!(record.faulting_frame.address, 0x7ffff6fad93b);
    assert_eq!(target[2], FILENAME_PLACEHOLDER);
}

#[test]
fn test_no_crash() {
    let engine = fake_engine(&abs_path("tests/gdbcrash_tests/clean_exit.txt"));
    let result = engine.run(&command(&["./target", "@@"]), Path::new(ABORT), 0, 0);
    assert!(matches!(result, Ok(None)));

    // Target output without any markers.
    let engine = fake_engine("stdin");
    let dir = tempfile::tempdir().unwrap();
    let candidate = dir.path().join("input");
    fs::write(&candidate, "[Inferior 1 (process 7) exited normally]\n").unwrap();
    let result = engine.run(&command(&["./target"]), &candidate, 0, 0);
    assert!(matches!(result, Ok(None)));
}

#[test]
fn test_parse_failure() {
    let engine = fake_engine(&abs_path("tests/gdbcrash_tests/broken_hash.txt"));
    let result = engine.run(&command(&["./pdftocairo", "@@"]), Path::new(ABORT), 0, 0);
    let Err(Error::Parse(failure)) = result else {
        panic!("Broken hash line must be a parse failure");
    };
    assert!(failure.transcript.starts_with("<EXPLOITABLE>"));
    assert!(failure.command.starts_with("sh "));
    assert!(failure.command.contains("--ex exploitable -v"));
    assert!(failure
        .command
        .ends_with(&format!("--args ./pdftocairo {ABORT}")));
}

#[test]
fn test_timeout() {
    let engine = fake_engine("sleep");
    let start = Instant::now();
    let result = engine.run(&command(&["./target", "@@"]), Path::new(ABORT), 0, 1);
    assert!(matches!(result, Ok(None)));
    assert!(start.elapsed() < Duration::from_secs(20));
}

#[test]
fn test_timeout_kills_detached_target() {
    let engine = fake_engine("setsid");
    let start = Instant::now();
    let result = engine.run(
        &command(&["sh", "-c", "sleep 30 # @@"]),
        Path::new(ABORT),
        0,
        1,
    );
    assert!(matches!(result, Ok(None)));
    assert!(start.elapsed() < Duration::from_secs(15));
}

#[test]
fn test_memlimit() {
    let engine = fake_engine("exec");
    let check = format!("[ \"$(ulimit -v)\" = 524288 ] && cat {}", abs_path(ABORT));
    let target = command(&["sh", "-c", &check]);

    let record = engine.run(&target, Path::new(ABORT), 524288, 0).unwrap();
    assert!(record.is_some());

    // Without the limit the target prints nothing.
    let record = engine.run(&target, Path::new(ABORT), 0, 0).unwrap();
    assert!(record.is_none());
}

/// Executable wrapper around the stand-in debugger replaying target stdin.
fn fake_gdb(dir: &Path) -> PathBuf {
    let fake = dir.join("gdb");
    fs::write(
        &fake,
        format!("#!/bin/sh\nexec sh {} stdin \"$@\"\n", abs_path(FAKE_GDB)),
    )
    .unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();
    }
    fake
}

#[test]
fn test_gdbcrash_cli() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("crashes");
    let output = dir.path().join("reports");
    fs::create_dir(&input).unwrap();
    fs::copy(ABORT, input.join("id:000000")).unwrap();
    fs::copy("tests/gdbcrash_tests/clean_exit.txt", input.join("id:000001")).unwrap();
    let fake = fake_gdb(dir.path());

    let result = Command::new((*EXE_DIR.read().unwrap()).clone().join("gdbcrash"))
        .args([
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--stdout",
            "-j",
            "2",
            "--gdb",
            fake.to_str().unwrap(),
            "--",
            "./target",
        ])
        .output()
        .expect("failed to start gdbcrash");

    let err = String::from_utf8_lossy(&result.stderr);
    assert!(result.status.success(), "{err}");
    assert!(err.contains("No crash on input"), "{err}");

    let report: Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(report["Classification"].as_str(), Some("UNKNOWN"));
    assert_eq!(report["Command"][0].as_str(), Some("./target"));

    let saved = output.join("id:000000.gdbcrash.json");
    let report: Value = serde_json::from_str(&fs::read_to_string(saved).unwrap()).unwrap();
    assert_eq!(
        report["Hash"].as_str(),
        Some("71c14ffe39944b60af6fd47d1e505f97.0822ff5e99ce7ad4a1e6e98b273082a7")
    );
    assert_eq!(report["FaultingFrame"]["Symbol"].as_str(), Some("None"));
    assert!(!output.join("id:000001.gdbcrash.json").exists());
}

#[test]
fn test_gdbcrash_cli_parse_failure() {
    let dir = tempfile::tempdir().unwrap();
    let candidate = dir.path().join("id:000002");
    fs::copy("tests/gdbcrash_tests/broken_hash.txt", &candidate).unwrap();
    let fake = fake_gdb(dir.path());

    let result = Command::new((*EXE_DIR.read().unwrap()).clone().join("gdbcrash"))
        .args([
            "-i",
            candidate.to_str().unwrap(),
            "--stdout",
            "--gdb",
            fake.to_str().unwrap(),
            "--",
            "./target",
        ])
        .output()
        .expect("failed to start gdbcrash");

    let err = String::from_utf8_lossy(&result.stderr);
    assert!(!result.status.success());
    assert!(result.stdout.is_empty(), "{err}");
    assert!(err.contains("BUG: Internal error parsing gdb output"), "{err}");
    assert!(err.contains("1 gdb transcripts couldn't be parsed"), "{err}");
}
