//! Common utility functions for the command line tool.
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{bail, Context, Result};
use log::info;
use simplelog::*;

use crate::report::CrashReport;

/// Initialize logging on stderr (`debug` or `info` level).
pub fn initialize_logging(level: &str) {
    let log_level = if level == "debug" {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder = ConfigBuilder::new();
    let config = match builder.set_time_offset_to_local() {
        Ok(builder) | Err(builder) => builder.build(),
    };
    let _ = TermLogger::init(log_level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

/// Get candidate files
///
/// # Arguments
///
/// * `input` - candidate file or directory with candidates
///
/// # Return value
///
/// Sorted candidate paths
pub fn candidates(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("Input doesn't exist: {}", input.display());
    }
    let mut candidates = Vec::new();
    for entry in fs::read_dir(input).with_context(|| format!("File: {}", input.display()))? {
        let path = entry?.path();
        if path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates)
}

/// Path to the report for `candidate` in `dir`.
pub fn report_path(dir: &Path, candidate: &Path) -> PathBuf {
    let name = candidate
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "crash".to_string());
    dir.join(format!("{name}.gdbcrash.json"))
}

/// Save a report
///
/// # Arguments
///
/// * `report` - crash report
///
/// * `dir` - output directory
pub fn save_report(report: &CrashReport, dir: &Path, candidate: &Path) -> Result<PathBuf> {
    let repstr = serde_json::to_string_pretty(report)?;
    let path = report_path(dir, candidate);
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("Couldn't save report to file: {}", path.display()))?;
    file.write_all(repstr.as_bytes())
        .with_context(|| format!("Couldn't write data to report file `{}`", path.display()))?;
    Ok(path)
}

/// Counts one processed item when dropped, also when its worker panics.
pub struct Processed<'a>(pub &'a RwLock<usize>);

impl Drop for Processed<'_> {
    fn drop(&mut self) {
        if let Ok(mut n) = self.0.write() {
            *n += 1;
        }
    }
}

/// Marks all `total` items processed when dropped, so progress logging stops
/// even if the pool gave up on some items.
pub struct Finished<'a>(pub &'a RwLock<usize>, pub usize);

impl Drop for Finished<'_> {
    fn drop(&mut self) {
        if let Ok(mut n) = self.0.write() {
            *n = (*n).max(self.1);
        }
    }
}

/// Function logs progress
///
/// # Arguments
///
/// * `processed_items` - current number of processed elements
///
/// * `total` - total number of elements
pub fn log_progress(processed_items: &RwLock<usize>, total: usize) {
    let mut cnt = 0;

    loop {
        let current = processed_items.read().map(|n| *n).unwrap_or(total);

        if current >= total {
            return;
        }

        if current > 0 && current > cnt {
            info!("Progress: {}/{}", current, total);
        }
        cnt = current;
        std::thread::sleep(std::time::Duration::from_millis(1000));
    }
}
