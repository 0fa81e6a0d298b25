//! CSV writer for export operations
//!
//! One header row with the table's columns, then one row per record. There
//! is no index column. Cells are rendered with [`stringify`], so `null` and
//! missing fields are both written as empty cells.

use std::path::Path;

use ::csv::{QuoteStyle, WriterBuilder};
use tracing::debug;

use crate::error::{Result, SerializationError};
use crate::export::format::FormatTag;
use crate::export::table::{Table, stringify};

use super::TableWriter;

/// Writer for CSV format
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvWriter;

impl TableWriter for CsvWriter {
    fn format(&self) -> FormatTag {
        FormatTag::Csv
    }

    fn write(&self, table: &Table, path: &Path) -> Result<()> {
        debug!("Writing {} rows to CSV: {}", table.len(), path.display());

        if table.width() == 0 && !table.is_empty() {
            return Err(SerializationError::Csv(format!(
                "{} records have no fields; CSV cannot represent rows without columns",
                table.len()
            ))
            .into());
        }

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .from_path(path)
            .map_err(|e| SerializationError::Csv(format!("Failed to create file: {}", e)))?;

        // An empty index: no header, no rows.
        if table.width() > 0 {
            writer
                .write_record(table.columns())
                .map_err(|e| SerializationError::Csv(format!("Failed to write headers: {}", e)))?;

            for row in table.rows() {
                writer
                    .write_record(row.iter().map(|value| stringify(value).into_owned()))
                    .map_err(|e| SerializationError::Csv(format!("Failed to write row: {}", e)))?;
            }
        }

        writer
            .flush()
            .map_err(|e| SerializationError::Csv(format!("Failed to flush file: {}", e)))?;
        Ok(())
    }
}
