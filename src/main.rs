//! Lockstep CLI - batch image effects under interchangeable schedulers.
//!
//! ```text
//! lockstep small+big bsp 6
//! lockstep --config run.toml --fail-fast --json
//! ```

use anyhow::Context;
use clap::Parser;
use lockstep::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "lockstep")]
#[command(version)]
#[command(about = "Apply effect pipelines to batches of images", long_about = None)]
struct Args {
    /// Resolution directories, `+`-separated (e.g. `small+big`)
    data_dirs: Option<String>,

    /// Scheduling model: sequential (s, seq), bsp or pipeline
    mode: Option<Mode>,

    /// Worker count
    threads: Option<usize>,

    /// TOML run configuration; positionals and flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding effects.txt, in/ and out/
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Job list to read instead of <data-root>/effects.txt
    #[arg(long)]
    jobs: Option<PathBuf>,

    /// Stop at the first failed task
    #[arg(long)]
    fail_fast: bool,

    /// Log filter (e.g. `info`, `lockstep=debug`); defaults to RUST_LOG or `info`
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(error) => {
            log::error!("{error:#}");
            return ExitCode::from(2);
        }
    };

    let engine = ExecutionEngine::new(config);
    let report = match engine.execute(&PngStore::new()) {
        Ok(report) => report,
        Err(error) => {
            log::error!("{error}");
            return ExitCode::from(2);
        }
    };

    if args.json {
        match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(error) => log::error!("Failed to serialize report: {error}"),
        }
    } else {
        print_summary(&report);
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn init_logging(level: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.format_timestamp(None).init();
}

fn build_config(args: &Args) -> anyhow::Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("loading run configuration from {}", path.display()))?,
        None => RunConfig::new(),
    };

    if let Some(data_dirs) = &args.data_dirs {
        config = config.with_data_dirs(data_dirs.clone());
    }
    if let Some(mode) = args.mode {
        config = config.with_mode(mode);
    }
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    if let Some(root) = &args.data_root {
        config = config.with_data_root(root.clone());
    }
    if let Some(jobs) = &args.jobs {
        config = config.with_job_file(jobs.clone());
    }
    if args.fail_fast {
        config = config.with_failure_policy(FailurePolicy::Abort);
    }

    config.validate().context("invalid run configuration")?;
    Ok(config)
}

fn print_summary(report: &RunReport) {
    println!(
        "{} scheduler, {} thread(s): {} saved, {} failed in {:.2?}",
        report.mode,
        report.threads,
        report.stats.tasks_saved,
        report.stats.tasks_failed,
        report.stats.duration
    );
    if report.stats.rounds > 0 {
        println!("  barrier rounds: {}", report.stats.rounds);
    }
    for (outcome, error) in report.failures() {
        println!("  task {} ({}): {error}", outcome.index, outcome.destination.display());
    }
}
