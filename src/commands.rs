//! CLI command definitions
//!
//! Defines the clap commands for the harness binary.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run conformance scenarios against a target executable
    Run {
        /// Path to a debug-information-bearing target executable
        target: PathBuf,

        /// Path to the front-end under test (default: lldb-mi from PATH)
        #[arg(long)]
        frontend: Option<PathBuf>,

        /// Harness configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run only the named scenario(s); may be given multiple times
        #[arg(long = "scenario", short = 's')]
        scenarios: Vec<String>,

        /// Emit the report as JSON instead of human-readable output
        #[arg(long)]
        json: bool,
    },

    /// List the scenario catalog
    List,
}
