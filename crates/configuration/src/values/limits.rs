use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Resource limits applied to every executed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryLimits {
    /// Hard cap on the number of rows returned to the caller. Statements
    /// without a row-limiting clause have `LIMIT max_rows` injected during
    /// normalization; the executor truncates regardless.
    #[serde(default = "max_rows_default")]
    pub max_rows: u64,
    /// Database-side statement timeout (milliseconds).
    #[serde(default = "statement_timeout_default")]
    pub statement_timeout_ms: u64,
}

impl Default for QueryLimits {
    fn default() -> QueryLimits {
        QueryLimits {
            max_rows: max_rows_default(),
            statement_timeout_ms: statement_timeout_default(),
        }
    }
}

// for serde default //
fn max_rows_default() -> u64 {
    100
}
fn statement_timeout_default() -> u64 {
    5000
}
