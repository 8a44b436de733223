//! Metadata information regarding the database and tracked information.

pub mod database;

pub use database::{
    ColumnInfo, ForeignRelation, ForeignRelations, Nullable, ScalarType, TableInfo, TablesInfo,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata information.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub tables: TablesInfo,
}

impl Metadata {
    pub fn empty() -> Self {
        Metadata {
            tables: TablesInfo::empty(),
        }
    }
}
