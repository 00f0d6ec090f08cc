mod connection;
mod dataset;
mod error;
mod identifiers;
mod infer;
mod loader;
mod pg;
mod policy;
mod reader;
mod schema;
mod writer;

pub use connection::{ConnectionDescriptor, DEFAULT_CONNECT_TIMEOUT};
pub use dataset::{Column, ColumnType, TabularDataset, Value};
pub use error::{ErrorKind, LoadError, LoadResult};
pub use identifiers::{quote_ident, validate_identifier, TableRef, MAX_IDENTIFIER_LEN};
pub use infer::{classify, infer_column, widen, InferOptions};
pub use loader::{load_with_client, LoadConfig, LoadReport, Loader, DEFAULT_BATCH_SIZE};
pub use pg::{create_table_sql, insert_sql, PgSink};
pub use policy::WritePolicy;
pub use reader::{read_dataset, read_dataset_from_reader, CsvOptions};
pub use schema::{table_schema, TableColumn};
pub use writer::{
    rows_per_statement, stores_unchanged, write_dataset, ExistingColumn, TableSink, WriteOutcome,
    MAX_BIND_PARAMS,
};
