//! CSV input and output for the replay binary

pub mod csv_format;
pub mod reader;

pub use csv_format::{convert_movement, write_accounts_csv, CsvMovement, MovementRecord};
pub use reader::MovementReader;
