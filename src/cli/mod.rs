//! Command-line argument parsing for the replay binary

pub mod args;

pub use args::{CliArgs, LogLevel};

use clap::Parser;

/// Parse command-line arguments, exiting with a usage message on error
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
