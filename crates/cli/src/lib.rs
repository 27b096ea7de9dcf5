//! acssi CLI -- drive the replicated SSI key-value simulator from a
//! command-stream file or stdin, or generate and check a random one.

use clap::{Parser, Subcommand};

pub mod driver;
pub mod report;

#[derive(Debug, Parser)]
#[command(
    name = "acssi",
    about = "Replicated in-memory key-value store under Available Copies / SSI"
)]
pub struct App {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a command stream and print the event log
    Run(RunArgs),
    /// Generate a random coherent command stream and check it never
    /// violates the testable invariants
    Check(CheckArgs),
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Input file to read commands from; `-` (the default) reads stdin
    #[arg(long, default_value = "-")]
    pub input: String,
    /// Echo each input line before its output
    #[arg(long)]
    pub echo: bool,
}

#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// Number of sites to exercise, out of the fixed 10
    #[arg(long, default_value_t = acssi_core::NUM_SITES)]
    pub n_sites: u8,
    /// Number of variables to exercise, out of the fixed 20
    #[arg(long, default_value_t = acssi_core::NUM_VARIABLES)]
    pub n_vars: u8,
    /// Number of ticks to generate
    #[arg(long, default_value_t = 200)]
    pub n_ticks: u32,
    /// RNG seed, for reproducible runs
    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}
