use std::path::PathBuf;

use clap::Args;
use csvpg_engine::{LoadReport, WritePolicy};
use csvpg_lib::{run_load, AppResult, Settings};

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// CSV file with a header row.
    pub csv_path: PathBuf,

    /// Target table.
    pub table: String,

    /// What to do if the table exists: fail, replace or append.
    #[arg(long)]
    pub policy: Option<WritePolicy>,

    /// Rows per INSERT statement.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Also write a 0-based row number column with this name.
    #[arg(long)]
    pub index_column: Option<String>,

    /// Cell texts to load as NULL (repeatable). Replaces the default of "".
    #[arg(long = "null-value")]
    pub null_values: Vec<String>,

    /// Keep date-like columns as TEXT.
    #[arg(long)]
    pub no_parse_dates: bool,
}

impl IngestArgs {
    pub fn apply(&self, settings: &mut Settings) {
        settings.source_path = Some(self.csv_path.clone());
        settings.table = Some(self.table.clone());
        if let Some(policy) = self.policy {
            settings.policy = Some(policy);
        }
        if let Some(batch_size) = self.batch_size {
            settings.batch_size = Some(batch_size);
        }
        if let Some(index) = &self.index_column {
            settings.index_column = Some(index.clone());
        }
        if !self.null_values.is_empty() {
            settings.csv.null_values = Some(self.null_values.clone());
        }
        if self.no_parse_dates {
            settings.csv.parse_dates = Some(false);
        }
    }
}

pub fn run(settings: &Settings, json: bool) -> AppResult<String> {
    let report = run_load(settings)?;
    if json {
        Ok(serde_json::to_string_pretty(&report)?)
    } else {
        Ok(summary(&report))
    }
}

fn summary(report: &LoadReport) -> String {
    let action = if report.created {
        "created"
    } else if report.replaced {
        "replaced"
    } else {
        "appended to"
    };
    format!(
        "{action} {table}: {rows} rows, {cols} columns in {ms} ms",
        table = report.table,
        rows = report.rows_written,
        cols = report.columns.len(),
        ms = report.elapsed_ms
    )
}
