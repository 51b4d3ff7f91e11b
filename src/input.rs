use std::fs;
use std::io::Read;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use crate::error::InputError;

/// Upload extensions accepted for bulk verification.
pub const ALLOWED_EXTENSIONS: &[&str] = &["csv", "txt", "xlsx", "xls"];

/// One cell from the first column of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEntry {
    /// No cell, or an empty one.
    Missing,
    /// The cell text, untrimmed.
    Value(String),
    /// Bytes that are not valid UTF-8, lossily decoded.
    Malformed(String),
}

impl RawEntry {
    /// Text to echo back in the result artifact.
    pub fn original(&self) -> &str {
        match self {
            Self::Missing => "",
            Self::Value(text) | Self::Malformed(text) => text,
        }
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::Missing;
        }
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::Value(text.to_string()),
            Err(_) => Self::Malformed(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    fn from_cell(cell: &Data) -> Self {
        match cell {
            Data::Empty => Self::Missing,
            Data::String(text) if text.is_empty() => Self::Missing,
            Data::String(text) => Self::Value(text.clone()),
            Data::Error(_) => Self::Malformed(cell.to_string()),
            other => Self::Value(other.to_string()),
        }
    }
}

/// Returns the lowercased extension of `filename` if uploads of that type are accepted.
pub fn allowed_extension(filename: &str) -> Result<String, InputError> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| InputError::UnsupportedExtension {
            filename: filename.to_string(),
        })
}

/// Reads the first column of an uploaded file, one entry per row.
///
/// `.txt` files are read line by line, so blank lines become
/// [`RawEntry::Missing`]. `.xlsx` and `.xls` files are read from their first
/// sheet. Anything else is parsed as headerless CSV, where blank lines are
/// skipped by the parser.
pub fn read_rows(path: &Path) -> Result<Vec<RawEntry>, InputError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let map_err = |source: csv::Error| InputError::Read {
        path: path.to_path_buf(),
        source,
    };

    match extension.as_deref() {
        Some("txt") => {
            let bytes = fs::read(path).map_err(|err| map_err(csv::Error::from(err)))?;
            Ok(rows_from_lines(&bytes))
        }
        Some("xlsx" | "xls") => rows_from_workbook(path),
        _ => {
            let file = fs::File::open(path).map_err(|err| map_err(csv::Error::from(err)))?;
            rows_from_csv(file).map_err(map_err)
        }
    }
}

/// Reads the first column of the first sheet of a workbook.
///
/// Rows are taken over the sheet's used range, so gaps between filled rows
/// come back as [`RawEntry::Missing`].
pub fn rows_from_workbook(path: &Path) -> Result<Vec<RawEntry>, InputError> {
    let spreadsheet_err = |source: calamine::Error| InputError::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| InputError::NoSheets {
            path: path.to_path_buf(),
        })?
        .map_err(spreadsheet_err)?;

    Ok(range
        .rows()
        .map(|row| row.first().map(RawEntry::from_cell).unwrap_or(RawEntry::Missing))
        .collect())
}

/// Parses headerless CSV and keeps the first field of every record.
pub fn rows_from_csv<R: Read>(reader: R) -> Result<Vec<RawEntry>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    reader
        .byte_records()
        .map(|record| {
            let record = record?;
            Ok(record
                .get(0)
                .map(RawEntry::from_bytes)
                .unwrap_or(RawEntry::Missing))
        })
        .collect()
}

/// Splits plain text into one entry per line.
pub fn rows_from_lines(bytes: &[u8]) -> Vec<RawEntry> {
    if bytes.is_empty() {
        return Vec::new();
    }
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    body.split(|byte| *byte == b'\n')
        .map(|line| RawEntry::from_bytes(line.strip_suffix(b"\r").unwrap_or(line)))
        .collect()
}
