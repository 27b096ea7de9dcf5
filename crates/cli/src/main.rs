use std::fs::File;
use std::io::{self, BufReader};
use std::process;

use acssi_cli::{App, CheckArgs, Command, RunArgs};
use clap::Parser;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let app = App::parse();
    let result = match &app.command {
        Command::Run(args) => run(args),
        Command::Check(args) => check(args),
    };
    if let Err(code) = result {
        process::exit(code);
    }
}

/// Runs a command stream from `--input` (or stdin) to completion.
///
/// # Errors
///
/// Returns an exit code on a malformed `--input` path or an I/O failure;
/// a malformed command line or a transaction abort is reported inline and
/// does not fail the run.
fn run(args: &RunArgs) -> Result<(), i32> {
    let stdout = io::stdout();
    let stderr = io::stderr();
    if args.input == "-" {
        let stdin = io::stdin();
        acssi_cli::driver::run(stdin.lock(), stdout.lock(), stderr.lock(), args.echo)
    } else {
        let file = File::open(&args.input).map_err(|e| {
            eprintln!("failed to open {}: {e}", args.input);
            1
        })?;
        acssi_cli::driver::run(BufReader::new(file), stdout.lock(), stderr.lock(), args.echo)
    }
    .map_err(|e| {
        eprintln!("i/o error: {e}");
        1
    })
}

/// Generates a random coherent command stream and asserts the invariants
/// that are checkable without a reference linearizer (atomicity, monotone
/// commit ticks, first-committer-wins, down-site silence) hold throughout.
fn check(args: &CheckArgs) -> Result<(), i32> {
    let lines = acssi_testgen::generate_stream(args.seed, args.n_sites, args.n_vars, args.n_ticks);
    let report = acssi_testgen::checker::check(&lines);
    if report.violations.is_empty() {
        println!(
            "PASS ({} ticks, {} transactions, 0 violations)",
            lines.len(),
            report.transactions_seen
        );
        Ok(())
    } else {
        println!(
            "FAIL ({} ticks, {} transactions, {} violations)",
            lines.len(),
            report.transactions_seen,
            report.violations.len()
        );
        for v in &report.violations {
            println!("  - {v}");
        }
        Err(1)
    }
}
