//! Supported output formats
//!
//! [`FormatTag`] is a closed set. Everything that depends on the format
//! (extension, content type, serializer) is an exhaustive `match`, so a new
//! variant does not build until it has all three.

use std::fmt;
use std::str::FromStr;

use crate::error::DumpError;

use super::writers::{CsvWriter, JsonWriter, TableWriter, XlsxWriter};

/// Output format of a dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    /// Comma-separated values
    Csv,
    /// Pretty-printed JSON array of objects
    Json,
    /// Excel workbook with a single sheet
    Xlsx,
}

impl FormatTag {
    /// Every supported format
    pub const ALL: [FormatTag; 3] = [FormatTag::Csv, FormatTag::Json, FormatTag::Xlsx];

    /// Tag as accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::Csv => "csv",
            FormatTag::Json => "json",
            FormatTag::Xlsx => "xlsx",
        }
    }

    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            FormatTag::Csv => "csv",
            FormatTag::Json => "json",
            FormatTag::Xlsx => "xlsx",
        }
    }

    /// MIME type sent with the upload
    pub fn content_type(&self) -> &'static str {
        match self {
            FormatTag::Csv => "text/csv",
            FormatTag::Json => "application/json",
            FormatTag::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    /// Serializer for this format
    pub fn writer(&self) -> &'static dyn TableWriter {
        match self {
            FormatTag::Csv => &CsvWriter,
            FormatTag::Json => &JsonWriter,
            FormatTag::Xlsx => &XlsxWriter,
        }
    }
}

impl FromStr for FormatTag {
    type Err = DumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| DumpError::InvalidFormat(s.to_string()))
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
