//! Metadata information regarding the database: tables, columns and the
//! relationships between them. This is the grounding for prompt construction
//! and the reference the validator resolves identifiers against.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The scalar types a column may be declared with. Row values outside this
/// set cannot be produced by a well-configured deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Boolean,
    Smallint,
    Integer,
    Bigint,
    Real,
    #[serde(rename = "double precision")]
    DoublePrecision,
    Character,
    #[serde(rename = "character varying")]
    CharacterVarying,
    Text,
    Date,
    Timestamp,
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ScalarType::Boolean => "boolean",
            ScalarType::Smallint => "smallint",
            ScalarType::Integer => "integer",
            ScalarType::Bigint => "bigint",
            ScalarType::Real => "real",
            ScalarType::DoublePrecision => "double precision",
            ScalarType::Character => "character",
            ScalarType::CharacterVarying => "character varying",
            ScalarType::Text => "text",
            ScalarType::Date => "date",
            ScalarType::Timestamp => "timestamp",
        };
        write!(f, "{name}")
    }
}

/// Mapping from a "table" name to its information.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TablesInfo(pub BTreeMap<String, TableInfo>);

impl TablesInfo {
    pub fn empty() -> Self {
        TablesInfo(BTreeMap::new())
    }

    /// Look up a table by name, case-insensitively.
    pub fn lookup_table(&self, name: &str) -> Option<&TableInfo> {
        self.0
            .iter()
            .find(|(table_name, _)| table_name.eq_ignore_ascii_case(name))
            .map(|(_, info)| info)
    }

    /// Whether any table declares a column with this name, case-insensitively.
    pub fn column_in_any_table(&self, name: &str) -> bool {
        self.0.values().any(|table| {
            table
                .columns
                .keys()
                .any(|column| column.eq_ignore_ascii_case(name))
        })
    }
}

/// Information about a database table (or any other kind of relation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TableInfo {
    pub table_name: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub columns: BTreeMap<String, ColumnInfo>,
    #[serde(default)]
    pub foreign_relations: ForeignRelations,
}

/// Can this column contain null values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Nullable {
    #[default]
    Nullable,
    NonNullable,
}

/// Information about a database column. The description records the column's
/// semantic role and is surfaced verbatim in generation prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnInfo {
    pub name: String,
    pub r#type: ScalarType,
    #[serde(default)]
    pub nullable: Nullable,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A mapping from the name of a foreign key constraint to its value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ForeignRelations(pub BTreeMap<String, ForeignRelation>);

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignRelation {
    pub foreign_table: String,
    pub column_mapping: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tables() -> TablesInfo {
        let mut columns = BTreeMap::new();
        columns.insert(
            "user_id".to_string(),
            ColumnInfo {
                name: "user_id".to_string(),
                r#type: ScalarType::Integer,
                nullable: Nullable::NonNullable,
                description: None,
            },
        );
        let mut tables = BTreeMap::new();
        tables.insert(
            "users".to_string(),
            TableInfo {
                table_name: "users".to_string(),
                description: None,
                columns,
                foreign_relations: ForeignRelations::default(),
            },
        );
        TablesInfo(tables)
    }

    #[test]
    fn test_table_lookup_is_case_insensitive() {
        let tables = sample_tables();
        assert!(tables.lookup_table("USERS").is_some());
        assert!(tables.lookup_table("Users").is_some());
        assert!(tables.lookup_table("user").is_none());
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let tables = sample_tables();
        assert!(tables.column_in_any_table("USER_ID"));
        assert!(!tables.column_in_any_table("expertise"));
    }

    #[test]
    fn test_scalar_type_serializes_with_spaces() {
        let rendered = serde_json::to_string(&ScalarType::CharacterVarying).unwrap();
        assert_eq!(rendered, "\"character varying\"");
        assert_eq!(ScalarType::DoublePrecision.to_string(), "double precision");
    }
}
