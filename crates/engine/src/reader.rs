use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::{Column, TabularDataset};
use crate::identifiers::MAX_IDENTIFIER_LEN;
use crate::infer::{convert, infer_column, InferOptions};
use crate::{LoadError, LoadResult};

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub quote: u8,
    /// Cell texts read as SQL NULL.
    pub null_values: Vec<String>,
    /// Detect `DATE` and `TIMESTAMP` columns.
    pub parse_dates: bool,
    /// Strip surrounding whitespace from header names.
    pub trim_headers: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            null_values: vec![String::new()],
            parse_dates: true,
            trim_headers: false,
        }
    }
}

impl CsvOptions {
    fn infer_options(&self) -> InferOptions<'_> {
        InferOptions {
            null_values: &self.null_values,
            parse_dates: self.parse_dates,
        }
    }
}

/// Parse the whole file at `path` into memory.
pub fn read_dataset(path: &Path, options: &CsvOptions) -> LoadResult<TabularDataset> {
    let file = File::open(path).map_err(|err| LoadError::parse(path, None, err.to_string()))?;
    let dataset = read_dataset_from_reader(file, path, options)?;
    info!(
        path = %path.display(),
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "parsed csv"
    );
    Ok(dataset)
}

/// Parse CSV from any reader; `path` is only used in error messages.
pub fn read_dataset_from_reader<R: Read>(
    source: R,
    path: &Path,
    options: &CsvOptions,
) -> LoadResult<TabularDataset> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .quote(options.quote)
        .has_headers(true)
        .flexible(false)
        .from_reader(source);

    let header_record = rdr
        .headers()
        .map_err(|err| csv_error(path, err))?
        .clone();
    if header_record.is_empty() {
        return Err(LoadError::parse(path, Some(1), "file has no header row"));
    }
    let headers = header_names(&header_record, options.trim_headers);
    check_headers(&headers, path)?;

    // Cells are kept column-major so each column can be inferred in one pass.
    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    let mut record = StringRecord::new();
    loop {
        match rdr.read_record(&mut record) {
            Ok(true) => {
                for (cells, cell) in raw.iter_mut().zip(record.iter()) {
                    cells.push(cell.to_string());
                }
            }
            Ok(false) => break,
            Err(err) => return Err(csv_error(path, err)),
        }
    }

    let infer = options.infer_options();
    let row_count = raw.first().map_or(0, Vec::len);
    let mut columns = Vec::with_capacity(headers.len());
    let mut rows = vec![Vec::with_capacity(headers.len()); row_count];
    for (name, cells) in headers.into_iter().zip(raw) {
        let (column_type, nullable) = infer_column(cells.iter().map(String::as_str), infer);
        debug!(column = %name, ?column_type, nullable, "inferred column");
        for (row, cell) in rows.iter_mut().zip(&cells) {
            row.push(convert(cell, column_type, infer));
        }
        columns.push(Column {
            name,
            column_type,
            nullable,
        });
    }

    Ok(TabularDataset::new(columns, rows))
}

fn header_names(record: &StringRecord, trim: bool) -> Vec<String> {
    record
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let raw = if i == 0 { raw.trim_start_matches(BOM) } else { raw };
            let name = if trim { raw.trim() } else { raw };
            if name.is_empty() {
                format!("Unnamed: {i}")
            } else {
                name.to_string()
            }
        })
        .collect()
}

/// Header names become column names verbatim, so they must be unique and
/// within PostgreSQL's identifier length (longer names are truncated).
fn check_headers(headers: &[String], path: &Path) -> LoadResult<()> {
    let mut seen = HashSet::with_capacity(headers.len());
    for name in headers {
        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(LoadError::parse(
                path,
                Some(1),
                format!("column name {name:?} is longer than {MAX_IDENTIFIER_LEN} bytes"),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(LoadError::parse(
                path,
                Some(1),
                format!("duplicate column name {name:?}"),
            ));
        }
    }
    Ok(())
}

fn csv_error(path: &Path, err: csv::Error) -> LoadError {
    let line = err.position().map(|pos| pos.line());
    let message = match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("found {len} fields, expected {expected_len}"),
        csv::ErrorKind::Utf8 { .. } => "file is not valid UTF-8".to_string(),
        _ => err.to_string(),
    };
    LoadError::parse(path, line, message)
}
