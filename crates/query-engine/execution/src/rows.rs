//! Converting driver-native rows into a closed value representation.
//!
//! Row values are restricted to the variants below; a column of any other
//! type is a serialization error rather than a silent stringification.
//! Temporal values render as ISO-8601 text.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::ser::Serializer;
use serde::Serialize;
use sqlx::postgres::{PgColumn, PgRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::Error;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Int(value) => serializer.serialize_i64(*value),
            Value::Float(value) => serializer.serialize_f64(*value),
            Value::Text(value) => serializer.serialize_str(value),
            Value::Date(value) => serializer.serialize_str(&value.to_string()),
            Value::Timestamp(value) => serializer.serialize_str(&value.to_rfc3339()),
        }
    }
}

/// The result of executing one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowSet {
    pub column_names: Vec<String>,
    pub rows: Vec<IndexMap<String, Value>>,
    pub row_count: usize,
}

/// Take the driver rows and serialize them into a [`RowSet`].
pub fn rows_to_row_set(rows: &[PgRow]) -> Result<RowSet, Error> {
    let column_names = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect()
        })
        .unwrap_or_default();

    let mut serialized = Vec::with_capacity(rows.len());
    for row in rows {
        let mut object = IndexMap::with_capacity(row.columns().len());
        for column in row.columns() {
            object.insert(column.name().to_string(), column_value(row, column)?);
        }
        serialized.push(object);
    }

    Ok(RowSet {
        column_names,
        row_count: serialized.len(),
        rows: serialized,
    })
}

/// Decode one cell, dispatching on the driver's type name. The match is the
/// closed set of types the schema descriptor can declare.
fn column_value(row: &PgRow, column: &PgColumn) -> Result<Value, Error> {
    let index = column.ordinal();

    let raw = row.try_get_raw(index).map_err(Error::Db)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    match column.type_info().name() {
        "BOOL" => Ok(Value::Bool(row.try_get::<bool, _>(index).map_err(Error::Db)?)),
        "INT2" => Ok(Value::Int(
            row.try_get::<i16, _>(index).map_err(Error::Db)?.into(),
        )),
        "INT4" => Ok(Value::Int(
            row.try_get::<i32, _>(index).map_err(Error::Db)?.into(),
        )),
        "INT8" => Ok(Value::Int(row.try_get::<i64, _>(index).map_err(Error::Db)?)),
        "FLOAT4" => Ok(Value::Float(
            row.try_get::<f32, _>(index).map_err(Error::Db)?.into(),
        )),
        "FLOAT8" => Ok(Value::Float(
            row.try_get::<f64, _>(index).map_err(Error::Db)?,
        )),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => Ok(Value::Text(
            row.try_get::<String, _>(index).map_err(Error::Db)?,
        )),
        "DATE" => Ok(Value::Date(
            row.try_get::<NaiveDate, _>(index).map_err(Error::Db)?,
        )),
        "TIMESTAMP" => {
            let naive = row.try_get::<NaiveDateTime, _>(index).map_err(Error::Db)?;
            Ok(Value::Timestamp(DateTime::from_naive_utc_and_offset(
                naive, Utc,
            )))
        }
        "TIMESTAMPTZ" => Ok(Value::Timestamp(
            row.try_get::<DateTime<Utc>, _>(index).map_err(Error::Db)?,
        )),
        other => Err(Error::UnsupportedColumnType {
            column: column.name().to_string(),
            type_name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_serialize_to_plain_json() {
        let mut row = IndexMap::new();
        row.insert("flag".to_string(), Value::Bool(true));
        row.insert("count".to_string(), Value::Int(42));
        row.insert("ratio".to_string(), Value::Float(2.5));
        row.insert("name".to_string(), Value::Text("Ada".to_string()));
        row.insert("missing".to_string(), Value::Null);

        let rendered = serde_json::to_value(&row).unwrap();
        assert_eq!(
            rendered,
            serde_json::json!({
                "flag": true,
                "count": 42,
                "ratio": 2.5,
                "name": "Ada",
                "missing": null,
            })
        );
    }

    #[test]
    fn test_temporal_values_render_as_iso_8601() {
        let date = Value::Date(NaiveDate::from_ymd_opt(2026, 2, 3).unwrap());
        assert_eq!(serde_json::to_value(&date).unwrap(), "2026-02-03");

        let timestamp = Value::Timestamp(DateTime::from_naive_utc_and_offset(
            NaiveDate::from_ymd_opt(2026, 2, 3)
                .unwrap()
                .and_hms_opt(16, 0, 0)
                .unwrap(),
            Utc,
        ));
        assert_eq!(
            serde_json::to_value(&timestamp).unwrap(),
            "2026-02-03T16:00:00+00:00"
        );
    }

    #[test]
    fn test_empty_row_sets_serialize() {
        let row_set = rows_to_row_set(&[]).unwrap();
        assert_eq!(row_set.row_count, 0);
        assert!(row_set.column_names.is_empty());
        let rendered = serde_json::to_value(&row_set).unwrap();
        assert_eq!(rendered["rows"], serde_json::json!([]));
    }
}
