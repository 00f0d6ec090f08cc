mod logging;
mod settings;

use std::error::Error;

use csvpg_engine::{table_schema, LoadReport, Loader, TableColumn};
use tracing::info;

pub use logging::{init_logging, DEFAULT_FILTER};
pub use settings::{
    ConnectionSettings, CsvSettings, LoggingSettings, Settings, ENV_DATABASE_URL, ENV_LOG,
    ENV_PASSWORD,
};

pub type AppResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Run one load described by `settings`.
pub fn run_load(settings: &Settings) -> AppResult<LoadReport> {
    let config = settings.to_load_config()?;
    info!(
        source = %config.source_path.display(),
        table = %config.table,
        policy = %config.policy,
        database = %config.connection,
        "starting load"
    );
    Ok(Loader::new(config).load()?)
}

/// Describe the columns of `settings.table` in the target database.
pub fn run_schema(settings: &Settings) -> AppResult<Vec<TableColumn>> {
    let table = settings.table_ref()?;
    let mut client = settings.connection_descriptor()?.connect()?;
    Ok(table_schema(&mut client, &table)?)
}
