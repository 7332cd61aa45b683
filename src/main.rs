//! mi-harness - conformance testing for MI-style debugger front-ends
//!
//! Drives a debugger front-end through its textual protocol and checks
//! the responses against the scenario catalog.

use clap::Parser;
use mi_harness::{cli, commands::Commands, common::logging};

#[derive(Parser)]
#[command(name = "mi-harness", about = "Conformance test harness for MI-style debugger front-ends")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init();

    let cli = Cli::parse();

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
