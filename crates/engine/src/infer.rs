use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::dataset::{ColumnType, Value};

/// Cell-level inference settings, borrowed from [`crate::CsvOptions`].
#[derive(Debug, Clone, Copy)]
pub struct InferOptions<'a> {
    pub null_values: &'a [String],
    pub parse_dates: bool,
}

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Classify one cell. `None` means the cell is a null marker.
pub fn classify(cell: &str, opts: InferOptions<'_>) -> Option<ColumnType> {
    if is_null(cell, opts) {
        return None;
    }
    if cell.parse::<i64>().is_ok() {
        return Some(ColumnType::Integer);
    }
    if parse_float(cell).is_some() {
        return Some(ColumnType::Float);
    }
    if parse_bool(cell).is_some() {
        return Some(ColumnType::Boolean);
    }
    if opts.parse_dates {
        if parse_date(cell).is_some() {
            return Some(ColumnType::Date);
        }
        if parse_timestamp(cell).is_some() {
            return Some(ColumnType::Timestamp);
        }
    }
    Some(ColumnType::Text)
}

/// Smallest type able to hold both `current` and `next`.
pub fn widen(current: ColumnType, next: ColumnType) -> ColumnType {
    use ColumnType::*;
    match (current, next) {
        (a, b) if a == b => a,
        (Integer, Float) | (Float, Integer) => Float,
        (Date, Timestamp) | (Timestamp, Date) => Timestamp,
        _ => Text,
    }
}

/// Infer a column's type and nullability from all of its cells.
/// A column with no non-null cells is `Text`.
pub fn infer_column<'c>(
    cells: impl IntoIterator<Item = &'c str>,
    opts: InferOptions<'_>,
) -> (ColumnType, bool) {
    let mut column_type: Option<ColumnType> = None;
    let mut nullable = false;
    for cell in cells {
        match classify(cell, opts) {
            None => nullable = true,
            Some(kind) => {
                column_type = Some(match column_type {
                    Some(current) => widen(current, kind),
                    None => kind,
                });
            }
        }
    }
    (column_type.unwrap_or(ColumnType::Text), nullable)
}

/// Convert a cell to `column_type`. The type must come from [`infer_column`]
/// over a set of cells that includes this one.
pub fn convert(cell: &str, column_type: ColumnType, opts: InferOptions<'_>) -> Value {
    if is_null(cell, opts) {
        return Value::Null;
    }
    let converted = match column_type {
        ColumnType::Integer => cell.parse().ok().map(Value::Integer),
        ColumnType::Float => parse_float(cell).map(Value::Float),
        ColumnType::Boolean => parse_bool(cell).map(Value::Boolean),
        ColumnType::Date => parse_date(cell).map(Value::Date),
        ColumnType::Timestamp => parse_timestamp(cell)
            .or_else(|| parse_date(cell).map(|d| d.and_time(NaiveTime::MIN)))
            .map(Value::Timestamp),
        ColumnType::Text => None,
    };
    converted.unwrap_or_else(|| Value::Text(cell.to_string()))
}

fn is_null(cell: &str, opts: InferOptions<'_>) -> bool {
    opts.null_values.iter().any(|marker| marker == cell)
}

// Requires a digit so that words like "inf" or "NaN" stay text.
fn parse_float(cell: &str) -> Option<f64> {
    if !cell.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    cell.parse().ok()
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Strict `YYYY-MM-DD`.
fn parse_date(cell: &str) -> Option<NaiveDate> {
    let bytes = cell.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(cell, "%Y-%m-%d").ok()
}

fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    let bytes = cell.as_bytes();
    if bytes.len() < 19 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
}
