//! Format writers for export operations
//!
//! Each writer encodes a whole [`Table`] to a file path. Writers are
//! selected through [`FormatTag::writer`](super::FormatTag::writer), never
//! looked up by name.

use std::path::Path;

use crate::error::Result;

use super::format::FormatTag;
use super::table::Table;

pub mod csv;
pub mod json;
pub mod xlsx;

pub use self::csv::CsvWriter;
pub use self::json::JsonWriter;
pub use self::xlsx::XlsxWriter;

/// Trait for encoding a table into one output format
pub trait TableWriter: Send + Sync {
    /// Format produced by this writer
    fn format(&self) -> FormatTag;

    /// Write `table` to `path`, creating or truncating the file
    ///
    /// # Arguments
    /// * `table` - Table to encode
    /// * `path` - Output file path
    ///
    /// # Returns
    /// * `Result<()>` - Success or `SerializationError`
    fn write(&self, table: &Table, path: &Path) -> Result<()>;
}
