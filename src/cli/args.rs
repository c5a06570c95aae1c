use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay a banking movements file through the ledger engine
#[derive(Parser, Debug)]
#[command(name = "bank-ledger")]
#[command(about = "Replay account movements through the banking ledger", long_about = None)]
pub struct CliArgs {
    /// Input CSV file containing movement rows (type, from, to, amount)
    #[arg(value_name = "INPUT", help = "Path to the movements CSV file")]
    pub input_file: PathBuf,

    /// Log verbosity for rejected rows and engine diagnostics
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "warn",
        help = "Log level: error, warn, info, debug, or trace"
    )]
    pub log_level: LogLevel,
}

/// Log verbosity choices
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
