//! JSON writer for export operations
//!
//! Writes the table as an array of objects, one per record, with every
//! column present (missing fields as `null`). Output is indented with four
//! spaces and keeps non-ASCII characters literal.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::debug;

use crate::error::{Result, SerializationError};
use crate::export::format::FormatTag;
use crate::export::table::Table;

use super::TableWriter;

const INDENT: &[u8] = b"    ";

/// Writer for JSON format
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWriter;

impl TableWriter for JsonWriter {
    fn format(&self) -> FormatTag {
        FormatTag::Json
    }

    fn write(&self, table: &Table, path: &Path) -> Result<()> {
        debug!("Writing {} rows to JSON: {}", table.len(), path.display());

        let file = File::create(path)
            .map_err(|e| SerializationError::Json(format!("Failed to create file: {}", e)))?;
        let mut writer = BufWriter::new(file);

        let mut serializer =
            Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(INDENT));
        table
            .records()
            .serialize(&mut serializer)
            .map_err(|e| SerializationError::Json(format!("Failed to encode rows: {}", e)))?;

        writer
            .flush()
            .map_err(|e| SerializationError::Json(format!("Failed to flush file: {}", e)))?;
        Ok(())
    }
}
