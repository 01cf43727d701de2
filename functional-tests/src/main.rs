// Functional test runner
//
// Runs directive-driven functional test files against the in-process
// executor and reports per-file results.
//
// Usage:
//   functional-tests run tests/testsuite --filter expiration
//   functional-tests eval tests/testsuite/transaction/expiration_time.mvir

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};

use functional_tests::config::HarnessConfig;
use functional_tests::fixtures::{evaluate, parse_test_file, run_checks, LocalExecutorBackend};
use functional_tests::suite::TestSuite;

#[derive(Parser, Debug)]
#[command(name = "functional-tests")]
#[command(about = "Run directive-driven ledger functional tests", long_about = None)]
struct Args {
    /// Harness configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run test files or directories of test files
    Run {
        /// Files or directories to run
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Only run files whose path contains this string
        #[arg(short, long)]
        filter: Option<String>,

        /// Number of files evaluated concurrently
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Summary)]
        format: ReportFormat,
    },
    /// Evaluate one test file and print its log
    Eval {
        /// Test file
        path: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReportFormat {
    Summary,
    Json,
    Junit,
}

fn load_config(path: Option<&PathBuf>) -> Result<HarnessConfig> {
    match path {
        Some(path) => HarnessConfig::load(path),
        None => Ok(HarnessConfig::default()),
    }
}

async fn run(
    paths: &[PathBuf],
    filter: Option<&str>,
    format: ReportFormat,
    config: HarnessConfig,
) -> Result<bool> {
    let mut suite = TestSuite::from_paths(paths, config)?;
    if let Some(pattern) = filter {
        suite = suite.filter(pattern);
    }
    info!("Running {} test files", suite.len());

    let report = suite.run().await;
    match format {
        ReportFormat::Summary => print!("{}", report.summary()),
        ReportFormat::Json => println!("{}", report.to_json()),
        ReportFormat::Junit => print!("{}", report.to_junit_xml()),
    }
    Ok(report.all_passed())
}

async fn eval(path: &Path, config: HarnessConfig) -> Result<bool> {
    let file = parse_test_file(path)?;
    let mut backend = LocalExecutorBackend::new(config.clone());
    let output = evaluate(&file, &config, &mut backend)
        .await
        .with_context(|| format!("Failed to evaluate {}", path.display()))?;

    let log = output.log.to_text();
    print!("{}", log);
    match run_checks(&file.checks, &log) {
        Ok(()) => Ok(true),
        Err(err) => {
            error!("{}", err);
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let result = match load_config(args.config.as_ref()) {
        Ok(mut config) => match args.command {
            Command::Run {
                paths,
                filter,
                jobs,
                format,
            } => {
                if let Some(jobs) = jobs {
                    config.jobs = jobs;
                }
                run(&paths, filter.as_deref(), format, config).await
            }
            Command::Eval { path } => eval(&path, config).await,
        },
        Err(err) => Err(err),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
