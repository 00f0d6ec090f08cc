use postgres::Client;
use serde::{Deserialize, Serialize};

use crate::identifiers::TableRef;
use crate::{LoadError, LoadResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub ordinal: i32,
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
}

/// Columns of `table` as recorded in `information_schema`. Unqualified
/// tables are looked up in the session's current schema. An unknown table
/// yields an empty list.
pub fn table_schema(client: &mut Client, table: &TableRef) -> LoadResult<Vec<TableColumn>> {
    table.validate()?;
    let rows = client
        .query(
            "SELECT ordinal_position::int4, column_name::text, data_type::text, \
                    is_nullable = 'YES', column_default::text \
             FROM information_schema.columns \
             WHERE table_schema::text = COALESCE($1::text, current_schema()::text) \
               AND table_name::text = $2::text \
             ORDER BY ordinal_position",
            &[&table.schema, &table.name],
        )
        .map_err(|err| LoadError::write_pg(table.to_string(), err))?;

    Ok(rows
        .iter()
        .map(|row| TableColumn {
            ordinal: row.get(0),
            name: row.get(1),
            data_type: row.get(2),
            nullable: row.get(3),
            default_value: row.get(4),
        })
        .collect())
}
