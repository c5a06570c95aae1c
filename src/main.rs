//! Banking Ledger CLI
//!
//! Replays a CSV of account movements through the ledger engine and writes
//! the final account states to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- movements.csv > accounts.csv
//! cargo run -- --log-level info movements.csv > accounts.csv
//! ```
//!
//! Each row is `type,from,to,amount` where type is deposit, withdrawal, or
//! transfer and the account columns are free-form aliases. Accounts are
//! provisioned on first reference; rejected rows are logged and skipped but
//! still leave FAILED transaction records inside the engine.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Fatal error (missing arguments, file not found, unwritable output)

use bank_ledger::cli;
use bank_ledger::replay::replay;
use std::process;

fn main() {
    let args = cli::parse_args();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(args.log_level))
        .with_writer(std::io::stderr)
        .init();

    let mut output = std::io::stdout();
    if let Err(e) = replay(&args.input_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
