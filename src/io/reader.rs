//! Streaming CSV reader for movement records
//!
//! Yields one movement per CSV row without loading the file into memory.
//! Fatal errors (file not found) surface from `new()`; per-row parse errors
//! are yielded as `Err` items so the replay driver can log and continue.

use crate::io::csv_format::{convert_movement, CsvMovement, MovementRecord};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Streaming reader over movement rows
#[derive(Debug)]
pub struct MovementReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl MovementReader {
    /// Open a movements CSV file for streaming iteration
    ///
    /// The reader trims whitespace and tolerates missing optional account
    /// columns.
    ///
    /// # Errors
    ///
    /// Returns a message if the file cannot be opened.
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for MovementReader {
    type Item = Result<MovementRecord, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut rows = self.reader.deserialize::<CsvMovement>();
        match rows.next()? {
            Ok(row) => {
                self.line_num += 1;
                Some(convert_movement(row).map_err(|e| format!("Line {}: {}", self.line_num + 1, e)))
            }
            Err(e) => {
                self.line_num += 1;
                Some(Err(format!(
                    "Line {}: CSV parse error: {}",
                    self.line_num + 1,
                    e
                )))
            }
        }
    }
}
