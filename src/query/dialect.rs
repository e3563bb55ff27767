//! Backend dialects: identifier quoting, string escaping and the few
//! functions whose spelling differs between engines.

use serde::{Deserialize, Serialize};
use sqlparser::ast::Ident;
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// Per-row uniform random column the Polars handle attaches to registered
/// frames for queries that reference it. Polars SQL has no random function.
pub const POLARS_RANDOM_COLUMN: &str = "__profiler_random";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Generic,
    Postgres,
    BigQuery,
    Polars,
}

impl Dialect {
    fn identifier_quote(self) -> char {
        match self {
            Dialect::BigQuery => '`',
            Dialect::Generic | Dialect::Postgres | Dialect::Polars => '"',
        }
    }

    pub fn quote_ident(self, name: &str) -> String {
        Ident::with_quote(self.identifier_quote(), name).to_string()
    }

    /// Quotes each dot-separated part of a qualified name.
    pub fn quote_qualified(self, parts: &[&str]) -> String {
        parts
            .iter()
            .map(|part| self.quote_ident(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn quote_string(self, value: &str) -> String {
        match self {
            Dialect::BigQuery => format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'")),
            Dialect::Generic | Dialect::Postgres | Dialect::Polars => {
                format!("'{}'", value.replace('\'', "''"))
            }
        }
    }

    /// Uniform random number in `[0, 1)`, drawn per row.
    pub fn random_function(self) -> String {
        match self {
            Dialect::BigQuery => "RAND()".to_string(),
            Dialect::Generic | Dialect::Postgres => "RANDOM()".to_string(),
            Dialect::Polars => self.quote_ident(POLARS_RANDOM_COLUMN),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Generic => "generic",
            Dialect::Postgres => "postgres",
            Dialect::BigQuery => "bigquery",
            Dialect::Polars => "polars",
        };
        f.write_str(name)
    }
}

impl FromStr for Dialect {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "generic" | "ansi" => Ok(Dialect::Generic),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "bigquery" => Ok(Dialect::BigQuery),
            "polars" => Ok(Dialect::Polars),
            other => Err(QueryError::configuration(format!(
                "Unknown backend dialect: {}",
                other
            ))),
        }
    }
}
