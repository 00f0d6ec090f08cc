use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{LoadError, LoadResult};

/// PostgreSQL truncates identifiers longer than `NAMEDATALEN - 1` bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

pub fn validate_identifier(kind: &str, name: &str) -> LoadResult<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(LoadError::InvalidConfig(format!("{kind} name is empty")));
    };
    if !is_ident_start(first) || !chars.all(is_ident_continue) {
        return Err(LoadError::InvalidConfig(format!(
            "{kind} name {name:?} must be alphanumeric or underscore and start with a letter or underscore"
        )));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(LoadError::InvalidConfig(format!(
            "{kind} name {name:?} is longer than {MAX_IDENTIFIER_LEN} bytes"
        )));
    }
    Ok(())
}

fn is_ident_start(value: char) -> bool {
    value == '_' || value.is_ascii_alphabetic()
}

fn is_ident_continue(value: char) -> bool {
    is_ident_start(value) || value.is_ascii_digit() || value == '$'
}

/// Quote an identifier so that case, spaces and punctuation survive as-is.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A target table, optionally qualified by schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn validate(&self) -> LoadResult<()> {
        if let Some(schema) = &self.schema {
            validate_identifier("schema", schema)?;
        }
        validate_identifier("table", &self.name)
    }

    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}
