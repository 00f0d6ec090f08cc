use std::error::Error;

use bytes::BytesMut;
use postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use postgres::{Statement, Transaction};

use crate::dataset::{Column, Value};
use crate::identifiers::{quote_ident, TableRef};
use crate::writer::{ExistingColumn, TableSink};
use crate::{LoadError, LoadResult};

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Integer(v) => v.to_sql(ty, out),
            Value::Float(v) => v.to_sql(ty, out),
            Value::Boolean(v) => v.to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::Text(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        [
            Type::INT8,
            Type::FLOAT8,
            Type::BOOL,
            Type::DATE,
            Type::TIMESTAMP,
            Type::TEXT,
        ]
        .contains(ty)
    }

    to_sql_checked!();
}

pub fn create_table_sql(table: &TableRef, columns: &[Column]) -> String {
    let defs = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql_name()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({defs})", table.quoted())
}

/// A multi-row `INSERT` with one typed placeholder per cell. The casts pin
/// parameter types to the inferred ones. Appends only reach here once
/// [`crate::stores_unchanged`] has cleared each target column type.
pub fn insert_sql(table: &TableRef, columns: &[Column], row_count: usize) -> String {
    let names = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("INSERT INTO {} ({names}) VALUES ", table.quoted());
    let mut param = 1;
    for row in 0..row_count {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!("${param}::{}", column.column_type.sql_name()));
            param += 1;
        }
        sql.push(')');
    }
    sql
}

/// [`TableSink`] over an open transaction.
pub struct PgSink<'a, 't> {
    tx: &'a mut Transaction<'t>,
    prepared: Option<(String, usize, Statement)>,
}

impl<'a, 't> PgSink<'a, 't> {
    pub fn new(tx: &'a mut Transaction<'t>) -> Self {
        Self { tx, prepared: None }
    }

    fn statement_for(
        &mut self,
        table: &TableRef,
        columns: &[Column],
        row_count: usize,
    ) -> LoadResult<Statement> {
        let key = table.to_string();
        if let Some((cached_table, cached_rows, statement)) = &self.prepared {
            if *cached_table == key && *cached_rows == row_count {
                return Ok(statement.clone());
            }
        }
        let sql = insert_sql(table, columns, row_count);
        let statement = self
            .tx
            .prepare(&sql)
            .map_err(|err| LoadError::write_pg(key.clone(), err))?;
        self.prepared = Some((key, row_count, statement.clone()));
        Ok(statement)
    }
}

impl TableSink for PgSink<'_, '_> {
    fn table_exists(&mut self, table: &TableRef) -> LoadResult<bool> {
        let row = self
            .tx
            .query_one("SELECT to_regclass($1::text) IS NOT NULL", &[&table.quoted()])
            .map_err(|err| LoadError::write_pg(table.to_string(), err))?;
        Ok(row.get(0))
    }

    fn existing_columns(&mut self, table: &TableRef) -> LoadResult<Vec<ExistingColumn>> {
        let rows = self
            .tx
            .query(
                "SELECT attname::text, format_type(atttypid, atttypmod) FROM pg_attribute \
                 WHERE attrelid = to_regclass($1::text)::oid AND attnum > 0 AND NOT attisdropped \
                 ORDER BY attnum",
                &[&table.quoted()],
            )
            .map_err(|err| LoadError::write_pg(table.to_string(), err))?;
        Ok(rows
            .iter()
            .map(|row| ExistingColumn {
                name: row.get(0),
                data_type: row.get(1),
            })
            .collect())
    }

    fn drop_table(&mut self, table: &TableRef) -> LoadResult<()> {
        self.prepared = None;
        self.tx
            .batch_execute(&format!("DROP TABLE {}", table.quoted()))
            .map_err(|err| LoadError::write_pg(table.to_string(), err))
    }

    fn create_table(&mut self, table: &TableRef, columns: &[Column]) -> LoadResult<()> {
        self.tx
            .batch_execute(&create_table_sql(table, columns))
            .map_err(|err| LoadError::write_pg(table.to_string(), err))
    }

    fn insert_rows(
        &mut self,
        table: &TableRef,
        columns: &[Column],
        rows: &[Vec<Value>],
    ) -> LoadResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let statement = self.statement_for(table, columns, rows.len())?;
        let params: Vec<&(dyn ToSql + Sync)> = rows
            .iter()
            .flat_map(|row| row.iter().map(|v| v as &(dyn ToSql + Sync)))
            .collect();
        self.tx
            .execute(&statement, &params)
            .map_err(|err| LoadError::write_pg(table.to_string(), err))
    }
}
