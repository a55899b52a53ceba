//! CLI frontend for the Broomtable adversity-token table.

mod commands;

use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "broomtable",
    about = "Broomtable: an adversity-token economy for shared dice tables",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log protocol traffic to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a scripted table through claims, spends, approvals, and denials
    Demo,

    /// Drive a seeded random action sequence and report replica consistency
    Simulate {
        /// RNG seed for a reproducible run
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Number of random player actions
        #[arg(short, long, default_value = "40")]
        actions: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Demo => commands::demo::run(),
        Commands::Simulate { seed, actions } => commands::simulate::run(seed, actions),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
