use gdbcrash::constants::{DEFAULT_EXPLOITABLE, GDB};
use gdbcrash::error::Error;
use gdbcrash::invocation::GdbConfig;
use gdbcrash::report::CrashReport;
use gdbcrash::run::{Debugger, GdbEngine};
use gdbcrash::util;

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgGroup};
use log::{error, info, warn};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

/// Result of running one candidate.
enum Outcome {
    Crash,
    NoCrash,
    LaunchError,
    ParseError,
}

fn main() -> Result<()> {
    let matches = clap::Command::new("gdbcrash")
        .version("0.1.0")
        .about("Reproduce crashes under gdb and collect exploitable reports")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .short('l')
                .action(ArgAction::Set)
                .default_value("info")
                .value_parser(["info", "debug"])
                .help("Logging level"),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .action(ArgAction::Set)
                .required(true)
                .value_name("FILE|DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Candidate file or directory with candidate files"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .action(ArgAction::Set)
                .value_name("OUTPUT_DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Directory to save crash reports to"),
        )
        .arg(
            Arg::new("stdout")
                .long("stdout")
                .action(ArgAction::SetTrue)
                .help("Print crash reports to stdout"),
        )
        .group(
            ArgGroup::new("out")
                .args(["stdout", "output"])
                .multiple(true)
                .required(true),
        )
        .arg(
            Arg::new("text")
                .long("text")
                .action(ArgAction::SetTrue)
                .requires("stdout")
                .help("Print human readable reports instead of JSON"),
        )
        .arg(
            Arg::new("memlimit")
                .short('m')
                .long("memlimit")
                .action(ArgAction::Set)
                .default_value("0")
                .value_name("KB")
                .value_parser(clap::value_parser!(u64))
                .help("Address space limit for the target in kilobytes, 0 for no limit"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .action(ArgAction::Set)
                .default_value("0")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .help("Timeout for one gdb run in seconds, 0 for no timeout"),
        )
        .arg(
            Arg::new("jobs")
                .long("jobs")
                .short('j')
                .value_name("N")
                .action(ArgAction::Set)
                .help("Number of parallel gdb runs")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new("gdb")
                .long("gdb")
                .action(ArgAction::Set)
                .default_value(GDB)
                .value_name("PATH")
                .help("Debugger program"),
        )
        .arg(
            Arg::new("exploitable")
                .long("exploitable")
                .action(ArgAction::Set)
                .default_value(DEFAULT_EXPLOITABLE)
                .value_name("PATH")
                .help("Path to the exploitable gdb extension"),
        )
        .arg(
            Arg::new("ARGS")
                .action(ArgAction::Set)
                .num_args(1..)
                .last(true)
                .required(true)
                .help("Add \"-- ./binary <arguments>\" to run executable, @@ is replaced by the candidate path"),
        )
        .get_matches();

    util::initialize_logging(
        matches
            .get_one::<String>("log-level")
            .map(String::as_str)
            .unwrap_or("info"),
    );

    let command: Vec<String> = matches
        .get_many::<String>("ARGS")
        .map(|args| args.cloned().collect())
        .unwrap_or_default();
    if command.is_empty() {
        bail!("Wrong arguments for starting program");
    }

    let Some(input) = matches.get_one::<PathBuf>("input") else {
        bail!("No input specified");
    };
    let candidates = util::candidates(input)?;
    if candidates.is_empty() {
        bail!("No candidate files in {}", input.display());
    }

    let output_dir = matches.get_one::<PathBuf>("output");
    if let Some(dir) = output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Couldn't create output directory {}", dir.display()))?;
    }
    let to_stdout = matches.get_flag("stdout");
    let as_text = matches.get_flag("text");

    let mut config = GdbConfig::default();
    if let Some(gdb) = matches.get_one::<String>("gdb") {
        config.program = gdb.clone();
    }
    if let Some(exploitable) = matches.get_one::<String>("exploitable") {
        config.exploitable = exploitable.clone();
    }
    let engine = GdbEngine::new(config);
    let memlimit = *matches.get_one::<u64>("memlimit").unwrap_or(&0);
    let timeout = *matches.get_one::<u64>("timeout").unwrap_or(&0);

    let jobs = if let Some(jobs) = matches.get_one::<u32>("jobs") {
        *jobs as usize
    } else {
        std::cmp::max(1, num_cpus::get() / 2)
    };
    let total = candidates.len();
    let custom_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.min(total))
        .build()
        .with_context(|| "Couldn't start thread pool")?;

    info!("Running {} candidates under gdb...", total);
    let processed = RwLock::new(0usize);
    let outcomes: Vec<Outcome> = std::thread::scope(|s| {
        s.spawn(|| util::log_progress(&processed, total));
        let _finished = util::Finished(&processed, total);
        custom_pool.install(|| {
            candidates
                .par_iter()
                .map(|candidate| {
                    let _done = util::Processed(&processed);
                    match engine.run(&command, candidate, memlimit, timeout) {
                        Ok(Some(crash)) => {
                            let report = CrashReport::new(&command, candidate, crash);
                            if to_stdout {
                                if as_text {
                                    println!("{report}\n");
                                } else if let Ok(repstr) = serde_json::to_string_pretty(&report) {
                                    println!("{repstr}\n");
                                }
                            }
                            if let Some(dir) = output_dir {
                                if let Err(err) = util::save_report(&report, dir, candidate) {
                                    error!("{:#}", err);
                                }
                            }
                            Outcome::Crash
                        }
                        Ok(None) => {
                            warn!("No crash on input {}", candidate.display());
                            Outcome::NoCrash
                        }
                        Err(err @ Error::Launch(..)) => {
                            error!("{} for input: {}", err, candidate.display());
                            Outcome::LaunchError
                        }
                        Err(err @ Error::Parse(_)) => {
                            error!("{}", err);
                            Outcome::ParseError
                        }
                    }
                })
                .collect()
        })
    });

    let count = |f: fn(&Outcome) -> bool| outcomes.iter().filter(|o| f(o)).count();
    let crashes = count(|o| matches!(o, Outcome::Crash));
    let no_crash = count(|o| matches!(o, Outcome::NoCrash));
    let launch_errors = count(|o| matches!(o, Outcome::LaunchError));
    let parse_errors = count(|o| matches!(o, Outcome::ParseError));
    info!(
        "Crashes: {}, no crash: {}, launch errors: {}, parse errors: {}",
        crashes, no_crash, launch_errors, parse_errors
    );

    if parse_errors > 0 {
        bail!("{} gdb transcripts couldn't be parsed", parse_errors);
    }
    Ok(())
}
