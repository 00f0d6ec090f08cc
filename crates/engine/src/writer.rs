use serde::Serialize;
use tracing::{debug, info};

use crate::dataset::{Column, ColumnType, TabularDataset, Value};
use crate::identifiers::TableRef;
use crate::policy::WritePolicy;
use crate::{LoadError, LoadResult};

/// PostgreSQL accepts at most this many bind parameters per statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Table operations the write step needs from a database.
///
/// Errors returned by a sink are expected to be [`LoadError::Write`].
pub trait TableSink {
    fn table_exists(&mut self, table: &TableRef) -> LoadResult<bool>;

    /// Columns of an existing table, in ordinal order.
    fn existing_columns(&mut self, table: &TableRef) -> LoadResult<Vec<ExistingColumn>>;

    fn drop_table(&mut self, table: &TableRef) -> LoadResult<()>;

    fn create_table(&mut self, table: &TableRef, columns: &[Column]) -> LoadResult<()>;

    /// Insert one batch; returns the number of rows inserted.
    fn insert_rows(
        &mut self,
        table: &TableRef,
        columns: &[Column],
        rows: &[Vec<Value>],
    ) -> LoadResult<u64>;
}

/// A column of a table that is already in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingColumn {
    pub name: String,
    /// Type as rendered by `format_type`, e.g. `bigint` or `numeric(10,2)`.
    pub data_type: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub created: bool,
    pub replaced: bool,
    pub rows_written: u64,
}

/// Rows per `INSERT` for a table of `column_count` columns.
pub fn rows_per_statement(batch_size: usize, column_count: usize) -> usize {
    let limit = MAX_BIND_PARAMS / column_count.max(1);
    batch_size.min(limit).max(1)
}

/// Apply `policy` to `table` and insert every row of `dataset`.
pub fn write_dataset<S: TableSink + ?Sized>(
    sink: &mut S,
    table: &TableRef,
    dataset: &TabularDataset,
    policy: WritePolicy,
    batch_size: usize,
) -> LoadResult<WriteOutcome> {
    let mut outcome = WriteOutcome::default();

    if sink.table_exists(table)? {
        match policy {
            WritePolicy::Fail => {
                return Err(LoadError::write(
                    table.to_string(),
                    "table already exists and the write policy is \"fail\"",
                ));
            }
            WritePolicy::Replace => {
                info!(%table, "dropping existing table");
                sink.drop_table(table)?;
                sink.create_table(table, dataset.columns())?;
                outcome.replaced = true;
            }
            WritePolicy::Append => {
                check_append_columns(sink, table, dataset)?;
            }
        }
    } else {
        sink.create_table(table, dataset.columns())?;
        outcome.created = true;
    }

    let chunk = rows_per_statement(batch_size, dataset.column_count());
    for batch in dataset.rows().chunks(chunk) {
        let inserted = sink.insert_rows(table, dataset.columns(), batch)?;
        outcome.rows_written += inserted;
        debug!(%table, inserted, total = outcome.rows_written, "inserted batch");
    }

    info!(
        %table,
        %policy,
        rows = outcome.rows_written,
        created = outcome.created,
        replaced = outcome.replaced,
        "wrote dataset"
    );
    Ok(outcome)
}

/// Appending needs every dataset column in the table, with a type that
/// stores the inferred values unchanged. All-null columns fit any type.
fn check_append_columns<S: TableSink + ?Sized>(
    sink: &mut S,
    table: &TableRef,
    dataset: &TabularDataset,
) -> LoadResult<()> {
    let existing = sink.existing_columns(table)?;
    let mut missing = Vec::new();
    let mut mismatched = Vec::new();
    for (i, column) in dataset.columns().iter().enumerate() {
        let Some(target) = existing.iter().find(|e| e.name == column.name) else {
            missing.push(column.name.as_str());
            continue;
        };
        let all_null = dataset.rows().iter().all(|row| row[i].is_null());
        if !all_null && !stores_unchanged(column.column_type, &target.data_type) {
            mismatched.push(format!(
                "{:?} ({} into {})",
                column.name,
                column.column_type.sql_name(),
                target.data_type
            ));
        }
    }

    if !missing.is_empty() {
        return Err(LoadError::write(
            table.to_string(),
            format!("cannot append, table has no column(s) {missing:?}"),
        ));
    }
    if !mismatched.is_empty() {
        return Err(LoadError::write(
            table.to_string(),
            format!("cannot append, incompatible column type(s): {}", mismatched.join(", ")),
        ));
    }
    Ok(())
}

/// Whether a column of `data_type` holds values inferred as `column_type`
/// without rounding or reinterpretation. Overflow and length limits are left
/// to the server, which rejects them.
pub fn stores_unchanged(column_type: ColumnType, data_type: &str) -> bool {
    let declared = data_type.trim().to_ascii_lowercase();
    let base = base_type(&declared);
    if matches!(
        base.as_str(),
        "text" | "character varying" | "varchar" | "character" | "char" | "bpchar"
    ) {
        return true;
    }
    match column_type {
        ColumnType::Integer => matches!(
            base.as_str(),
            "smallint" | "integer" | "bigint" | "numeric" | "double precision"
        ),
        // a scale on numeric rounds fractions
        ColumnType::Float => declared == "numeric" || base == "double precision",
        ColumnType::Boolean => base == "boolean",
        ColumnType::Date => matches!(
            base.as_str(),
            "date" | "timestamp" | "timestamp without time zone" | "timestamp with time zone"
        ),
        ColumnType::Timestamp => matches!(
            base.as_str(),
            "timestamp" | "timestamp without time zone" | "timestamp with time zone"
        ),
        ColumnType::Text => false,
    }
}

/// `numeric(10,2)` -> `numeric`, `timestamp(3) without time zone` ->
/// `timestamp without time zone`.
fn base_type(data_type: &str) -> String {
    let mut out = String::with_capacity(data_type.len());
    let mut depth = 0usize;
    for ch in data_type.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;

    use super::{ExistingColumn, TableSink};
    use crate::dataset::{Column, Value};
    use crate::identifiers::TableRef;
    use crate::LoadResult;

    /// In-memory stand-in for a database, keyed by rendered table name.
    #[derive(Debug, Default)]
    pub struct MemorySink {
        pub tables: HashMap<String, (Vec<Column>, Vec<Vec<Value>>)>,
        pub statements: usize,
    }

    impl MemorySink {
        pub fn rows(&self, table: &TableRef) -> usize {
            self.tables
                .get(&table.to_string())
                .map_or(0, |(_, rows)| rows.len())
        }
    }

    impl TableSink for MemorySink {
        fn table_exists(&mut self, table: &TableRef) -> LoadResult<bool> {
            Ok(self.tables.contains_key(&table.to_string()))
        }

        fn existing_columns(&mut self, table: &TableRef) -> LoadResult<Vec<ExistingColumn>> {
            Ok(self
                .tables
                .get(&table.to_string())
                .map(|(columns, _)| {
                    columns
                        .iter()
                        .map(|c| ExistingColumn {
                            name: c.name.clone(),
                            data_type: c.column_type.sql_name().to_ascii_lowercase(),
                        })
                        .collect()
                })
                .unwrap_or_default())
        }

        fn drop_table(&mut self, table: &TableRef) -> LoadResult<()> {
            self.tables.remove(&table.to_string());
            Ok(())
        }

        fn create_table(&mut self, table: &TableRef, columns: &[Column]) -> LoadResult<()> {
            self.tables
                .insert(table.to_string(), (columns.to_vec(), Vec::new()));
            Ok(())
        }

        fn insert_rows(
            &mut self,
            table: &TableRef,
            _columns: &[Column],
            rows: &[Vec<Value>],
        ) -> LoadResult<u64> {
            self.statements += 1;
            let entry = self
                .tables
                .get_mut(&table.to_string())
                .ok_or_else(|| crate::LoadError::write(table.to_string(), "no such table"))?;
            entry.1.extend(rows.iter().cloned());
            Ok(rows.len() as u64)
        }
    }
}
