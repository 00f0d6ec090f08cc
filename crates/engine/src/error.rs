use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`LoadError`], used for exit codes and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConfig,
    Connection,
    Parse,
    Write,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: postgres::Error,
    },

    #[error("could not parse {}{}: {message}", .path.display(), line_suffix(.line))]
    Parse {
        path: PathBuf,
        line: Option<u64>,
        message: String,
    },

    #[error("write to {table} failed: {message}")]
    Write {
        table: String,
        message: String,
        #[source]
        source: Option<postgres::Error>,
    },
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            LoadError::Connection { .. } => ErrorKind::Connection,
            LoadError::Parse { .. } => ErrorKind::Parse,
            LoadError::Write { .. } => ErrorKind::Write,
        }
    }

    pub(crate) fn parse(
        path: impl Into<PathBuf>,
        line: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        LoadError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn write(table: impl Into<String>, message: impl Into<String>) -> Self {
        LoadError::Write {
            table: table.into(),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn write_pg(table: impl Into<String>, source: postgres::Error) -> Self {
        let message = match source.as_db_error() {
            Some(db) => format!("{} ({})", db.message(), db.code().code()),
            None => source.to_string(),
        };
        LoadError::Write {
            table: table.into(),
            message,
            source: Some(source),
        }
    }
}

fn line_suffix(line: &Option<u64>) -> String {
    match line {
        Some(line) => format!(" (line {line})"),
        None => String::new(),
    }
}

pub type LoadResult<T> = Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::{ErrorKind, LoadError};

    #[test]
    fn parse_error_mentions_path_and_line() {
        let err = LoadError::parse("/data/covid.csv", Some(4), "found 2 fields, expected 3");
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(
            err.to_string(),
            "could not parse /data/covid.csv (line 4): found 2 fields, expected 3"
        );
    }

    #[test]
    fn write_error_without_source() {
        let err = LoadError::write("public.covid", "table already exists");
        assert_eq!(err.kind(), ErrorKind::Write);
        assert!(err.to_string().contains("public.covid"));
        assert!(std::error::Error::source(&err).is_none());
    }
}
