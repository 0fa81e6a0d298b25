//! Excel writer for export operations
//!
//! Produces a workbook with a single sheet: a bold header row and one row
//! per record, no index column. Numbers, booleans and strings keep their
//! native cell types; `null` leaves the cell blank and nested values are
//! written as compact JSON text.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SerializationError};
use crate::export::format::FormatTag;
use crate::export::table::{Table, stringify};

use super::TableWriter;

/// Largest integer magnitude an Excel (f64) cell holds exactly
const MAX_EXACT_INTEGER: u64 = 1 << 53;

/// Writer for Excel format
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxWriter;

impl TableWriter for XlsxWriter {
    fn format(&self) -> FormatTag {
        FormatTag::Xlsx
    }

    fn write(&self, table: &Table, path: &Path) -> Result<()> {
        debug!("Writing {} rows to XLSX: {}", table.len(), path.display());

        if table.width() == 0 && !table.is_empty() {
            return Err(SerializationError::Spreadsheet(format!(
                "{} records have no fields; a sheet cannot represent rows without columns",
                table.len()
            ))
            .into());
        }

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let header = Format::new().set_bold();

        for (col, name) in table.columns().iter().enumerate() {
            worksheet
                .write_string_with_format(0, column_number(col)?, name, &header)
                .map_err(spreadsheet_error)?;
        }

        for (index, row) in table.rows().iter().enumerate() {
            let row_number = u32::try_from(index + 1).map_err(|_| {
                SerializationError::Spreadsheet(format!("Row {} exceeds sheet limits", index + 1))
            })?;
            for (col, value) in row.iter().enumerate() {
                write_cell(worksheet, row_number, column_number(col)?, value)?;
            }
        }

        workbook
            .save(path)
            .map_err(|e| SerializationError::Spreadsheet(format!("Failed to save workbook: {}", e)))?;
        Ok(())
    }
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<()> {
    let written = match value {
        Value::Null => return Ok(()),
        Value::Bool(b) => worksheet.write_boolean(row, col, *b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if is_exact(n) => worksheet.write_number(row, col, f),
            _ => worksheet.write_string(row, col, n.to_string()),
        },
        Value::String(s) => worksheet.write_string(row, col, s.as_str()),
        Value::Array(_) | Value::Object(_) => {
            worksheet.write_string(row, col, stringify(value).into_owned())
        }
    };
    written.map(|_| ()).map_err(spreadsheet_error)
}

/// Whether the number survives conversion to f64 unchanged
fn is_exact(n: &serde_json::Number) -> bool {
    if let Some(i) = n.as_i64() {
        i.unsigned_abs() <= MAX_EXACT_INTEGER
    } else if let Some(u) = n.as_u64() {
        u <= MAX_EXACT_INTEGER
    } else {
        true
    }
}

fn column_number(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| {
        SerializationError::Spreadsheet(format!("Column {} exceeds sheet limits", col + 1)).into()
    })
}

fn spreadsheet_error(e: XlsxError) -> crate::error::DumpError {
    SerializationError::Spreadsheet(e.to_string()).into()
}
