use clap::Args;
use csvpg_lib::{run_schema, AppResult, Settings};

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Table to describe.
    pub table: String,
}

impl SchemaArgs {
    pub fn apply(&self, settings: &mut Settings) {
        settings.table = Some(self.table.clone());
    }
}

pub fn run(settings: &Settings, json: bool) -> AppResult<String> {
    let columns = run_schema(settings)?;
    if json {
        return Ok(serde_json::to_string(&columns)?);
    }
    if columns.is_empty() {
        return Err(format!("table {} not found", settings.table_ref()?).into());
    }
    Ok(columns
        .iter()
        .map(|c| {
            let null = if c.nullable { "" } else { " NOT NULL" };
            format!("{:>3}  {}  {}{null}", c.ordinal, c.name, c.data_type)
        })
        .collect::<Vec<_>>()
        .join("\n"))
}
