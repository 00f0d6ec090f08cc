use std::path::PathBuf;
use std::time::Instant;

use postgres::Client;
use serde::Serialize;
use tracing::{info, info_span};

use crate::connection::ConnectionDescriptor;
use crate::dataset::{Column, TabularDataset};
use crate::identifiers::{validate_identifier, TableRef};
use crate::pg::PgSink;
use crate::policy::WritePolicy;
use crate::reader::{read_dataset, CsvOptions};
use crate::writer::write_dataset;
use crate::{LoadError, LoadResult};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Everything one load needs. Nothing here is read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadConfig {
    pub source_path: PathBuf,
    pub table: TableRef,
    pub connection: ConnectionDescriptor,
    pub policy: WritePolicy,
    pub csv: CsvOptions,
    pub batch_size: usize,
    /// When set, a 0-based row number column with this name is written first.
    pub index_column: Option<String>,
}

impl LoadConfig {
    pub fn new(source_path: impl Into<PathBuf>, table: TableRef) -> Self {
        Self {
            source_path: source_path.into(),
            table,
            connection: ConnectionDescriptor::default(),
            policy: WritePolicy::default(),
            csv: CsvOptions::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            index_column: None,
        }
    }

    pub fn with_connection(mut self, connection: ConnectionDescriptor) -> Self {
        self.connection = connection;
        self
    }

    pub fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_csv_options(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_index_column(mut self, name: impl Into<String>) -> Self {
        self.index_column = Some(name.into());
        self
    }

    pub fn validate(&self) -> LoadResult<()> {
        self.table.validate()?;
        self.connection.validate()?;
        if self.batch_size == 0 {
            return Err(LoadError::InvalidConfig("batch size must be at least 1".into()));
        }
        if let Some(index) = &self.index_column {
            validate_identifier("index column", index)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub policy: WritePolicy,
    pub rows_written: u64,
    pub columns: Vec<Column>,
    pub created: bool,
    pub replaced: bool,
    pub elapsed_ms: u128,
}

pub struct Loader {
    config: LoadConfig,
}

impl Loader {
    pub fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Connect, parse the file, and write it in one transaction.
    ///
    /// The connection is opened before the file is read, so an unreachable
    /// database is reported as [`LoadError::Connection`] whatever the state
    /// of the file. A [`LoadError::Write`] rolls the transaction back and
    /// leaves the target table as it was.
    pub fn load(&self) -> LoadResult<LoadReport> {
        let span = info_span!("load", table = %self.config.table);
        let _enter = span.enter();

        self.config.validate()?;
        let mut client = self.config.connection.connect()?;
        load_with_client(&mut client, &self.config)
    }
}

/// Parse and write using a caller-owned client. Validates `config` but
/// ignores its connection descriptor.
pub fn load_with_client(client: &mut Client, config: &LoadConfig) -> LoadResult<LoadReport> {
    let started = Instant::now();
    config.validate()?;

    let mut dataset = read_dataset(&config.source_path, &config.csv)?;
    if let Some(index) = &config.index_column {
        if dataset.column(index).is_some() {
            return Err(LoadError::parse(
                &config.source_path,
                Some(1),
                format!("index column {index:?} clashes with a header"),
            ));
        }
        dataset = dataset.with_index_column(index);
    }

    let report = write_in_transaction(client, config, &dataset, started)?;
    info!(
        table = %report.table,
        rows = report.rows_written,
        elapsed_ms = report.elapsed_ms as u64,
        "load complete"
    );
    Ok(report)
}

fn write_in_transaction(
    client: &mut Client,
    config: &LoadConfig,
    dataset: &TabularDataset,
    started: Instant,
) -> LoadResult<LoadReport> {
    let table = config.table.to_string();
    // Nothing has been written if BEGIN fails, so the link itself is at fault.
    let mut tx = client
        .transaction()
        .map_err(|source| LoadError::Connection {
            target: "database server".into(),
            source,
        })?;

    let outcome = {
        let mut sink = PgSink::new(&mut tx);
        write_dataset(
            &mut sink,
            &config.table,
            dataset,
            config.policy,
            config.batch_size,
        )?
    };
    tx.commit()
        .map_err(|err| LoadError::write_pg(table.clone(), err))?;

    Ok(LoadReport {
        table,
        policy: config.policy,
        rows_written: outcome.rows_written,
        columns: dataset.columns().to_vec(),
        created: outcome.created,
        replaced: outcome.replaced,
        elapsed_ms: started.elapsed().as_millis(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{LoadConfig, LoadReport, Loader};
    use crate::connection::ConnectionDescriptor;
    use crate::dataset::{Column, ColumnType};
    use crate::identifiers::TableRef;
    use crate::policy::WritePolicy;
    use crate::ErrorKind;

    fn unreachable() -> ConnectionDescriptor {
        ConnectionDescriptor {
            host: "127.0.0.1".into(),
            port: 1,
            connect_timeout: Some(Duration::from_secs(2)),
            ..ConnectionDescriptor::default()
        }
    }

    #[test]
    fn builder_sets_fields() {
        let config = LoadConfig::new("data.csv", TableRef::new("covid"))
            .with_policy(WritePolicy::Append)
            .with_batch_size(50)
            .with_index_column("index");
        assert_eq!(config.policy, WritePolicy::Append);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.index_column.as_deref(), Some("index"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_table_is_rejected_before_connecting() {
        let config = LoadConfig::new("data.csv", TableRef::new("covid; drop table x"))
            .with_connection(unreachable());
        let err = Loader::new(config).load().expect_err("bad table");
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = LoadConfig::new("data.csv", TableRef::new("covid")).with_batch_size(0);
        assert_eq!(
            config.validate().expect_err("zero").kind(),
            ErrorKind::InvalidConfig
        );
    }

    #[test]
    fn report_serializes_for_callers() {
        let report = LoadReport {
            table: "covid".into(),
            policy: WritePolicy::Fail,
            rows_written: 2,
            columns: vec![Column {
                name: "new_cases".into(),
                column_type: ColumnType::Integer,
                nullable: false,
            }],
            created: true,
            replaced: false,
            elapsed_ms: 5,
        };
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["policy"], "fail");
        assert_eq!(json["rows_written"], 2);
        assert_eq!(json["columns"][0]["column_type"], "integer");
    }

    #[test]
    fn unreachable_database_wins_over_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = LoadConfig::new(dir.path().join("missing.csv"), TableRef::new("covid"))
            .with_connection(unreachable());
        let err = Loader::new(config).load().expect_err("unreachable");
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
