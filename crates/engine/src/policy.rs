use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What to do when the target table already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// Refuse to touch an existing table.
    #[default]
    Fail,
    /// Drop the existing table and recreate it from the file.
    Replace,
    /// Insert into the existing table.
    Append,
}

impl WritePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            WritePolicy::Fail => "fail",
            WritePolicy::Replace => "replace",
            WritePolicy::Append => "append",
        }
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WritePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "fail" => Ok(WritePolicy::Fail),
            "replace" => Ok(WritePolicy::Replace),
            "append" => Ok(WritePolicy::Append),
            other => Err(format!(
                "unknown write policy {other:?} (expected fail, replace or append)"
            )),
        }
    }
}
