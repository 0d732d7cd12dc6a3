//! BigQuery Wire Models
//!
//! SDK の型とドメイン型の相互変換

use chrono::{DateTime, Utc};
use google_cloud_bigquery::http::job::get_query_results::GetQueryResultsResponse;
use google_cloud_bigquery::http::job::query::QueryResponse;
use google_cloud_bigquery::http::table::{
    TableFieldMode, TableFieldSchema, TableFieldType, TableSchema,
};
use google_cloud_bigquery::http::tabledata::list::{Cell, Tuple, Value as BqValue};
use google_cloud_bigquery::http::types::{
    QueryParameter as BqQueryParameter, QueryParameterType, QueryParameterValue,
};
use log::warn;
use serde_json::Value;

use crate::domain::entities::schema::{FieldMode, FieldType, Schema, SchemaField};
use crate::domain::entities::table::{CellValue, Column, Table};
use crate::domain::errors::BigQueryHelperError;
use crate::domain::repositories::warehouse_repository::QueryParameter;

/// One page of a query job's results
///
/// Both `jobs.query` and `jobs.getQueryResults` responses are reduced to this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub job_id: String,
    pub location: Option<String>,
    pub job_complete: bool,
    pub schema: Option<TableSchema>,
    pub rows: Vec<Tuple>,
    pub page_token: Option<String>,
    pub num_dml_affected_rows: Option<i64>,
}

impl From<QueryResponse> for QueryPage {
    fn from(response: QueryResponse) -> Self {
        Self {
            job_id: response.job_reference.job_id,
            location: response.job_reference.location,
            job_complete: response.job_complete,
            schema: response.schema,
            rows: response.rows.unwrap_or_default(),
            page_token: response.page_token,
            num_dml_affected_rows: response.num_dml_affected_rows,
        }
    }
}

impl From<GetQueryResultsResponse> for QueryPage {
    fn from(response: GetQueryResultsResponse) -> Self {
        Self {
            job_id: response.job_reference.job_id,
            location: response.job_reference.location,
            job_complete: response.job_complete,
            schema: response.schema,
            rows: response.rows.unwrap_or_default(),
            page_token: response.page_token,
            num_dml_affected_rows: response.num_dml_affected_rows,
        }
    }
}

/// Maps an SDK field type to the domain tag, folding the legacy/standard SQL aliases
pub fn field_type_from_sdk(data_type: &TableFieldType) -> FieldType {
    match data_type {
        TableFieldType::Integer | TableFieldType::Int64 => FieldType::Integer,
        TableFieldType::Float | TableFieldType::Float64 => FieldType::Float,
        TableFieldType::String => FieldType::String,
        TableFieldType::Boolean | TableFieldType::Bool => FieldType::Boolean,
        TableFieldType::Timestamp => FieldType::Timestamp,
        TableFieldType::Bytes => FieldType::Other("BYTES".to_string()),
        TableFieldType::Record | TableFieldType::Struct => FieldType::Other("RECORD".to_string()),
        TableFieldType::Date => FieldType::Other("DATE".to_string()),
        TableFieldType::Time => FieldType::Other("TIME".to_string()),
        TableFieldType::Datetime => FieldType::Other("DATETIME".to_string()),
        TableFieldType::Numeric | TableFieldType::Decimal => {
            FieldType::Other("NUMERIC".to_string())
        }
        TableFieldType::Bignumeric | TableFieldType::Bigdecimal => {
            FieldType::Other("BIGNUMERIC".to_string())
        }
        TableFieldType::Interval => FieldType::Other("INTERVAL".to_string()),
        TableFieldType::Json => FieldType::Other("JSON".to_string()),
    }
}

/// Maps a domain tag to the SDK field type
///
/// Unknown tags fall back to STRING.
pub fn field_type_to_sdk(field_type: &FieldType) -> TableFieldType {
    match field_type {
        FieldType::Integer => TableFieldType::Integer,
        FieldType::Float => TableFieldType::Float,
        FieldType::String => TableFieldType::String,
        FieldType::Boolean => TableFieldType::Boolean,
        FieldType::Timestamp => TableFieldType::Timestamp,
        FieldType::Other(tag) => match tag.to_ascii_uppercase().as_str() {
            "INT64" => TableFieldType::Integer,
            "FLOAT64" => TableFieldType::Float,
            "BOOL" => TableFieldType::Boolean,
            "BYTES" => TableFieldType::Bytes,
            "RECORD" | "STRUCT" => TableFieldType::Record,
            "DATE" => TableFieldType::Date,
            "TIME" => TableFieldType::Time,
            "DATETIME" => TableFieldType::Datetime,
            "NUMERIC" | "DECIMAL" => TableFieldType::Numeric,
            "BIGNUMERIC" | "BIGDECIMAL" => TableFieldType::Bignumeric,
            "INTERVAL" => TableFieldType::Interval,
            "JSON" => TableFieldType::Json,
            _ => {
                warn!("Unknown field type `{}`, creating column as STRING", tag);
                TableFieldType::String
            }
        },
    }
}

fn mode_from_sdk(mode: &TableFieldMode) -> FieldMode {
    match mode {
        TableFieldMode::Nullable => FieldMode::Nullable,
        TableFieldMode::Required => FieldMode::Required,
        TableFieldMode::Repeated => FieldMode::Repeated,
    }
}

fn mode_to_sdk(mode: FieldMode) -> TableFieldMode {
    match mode {
        FieldMode::Nullable => TableFieldMode::Nullable,
        FieldMode::Required => TableFieldMode::Required,
        FieldMode::Repeated => TableFieldMode::Repeated,
    }
}

/// Converts table metadata into a domain schema
///
/// Fields without an explicit mode are reported as NULLABLE.
pub fn schema_from_sdk(schema: &TableSchema) -> Result<Schema, BigQueryHelperError> {
    let fields = schema
        .fields
        .iter()
        .map(|field| SchemaField {
            name: field.name.clone(),
            field_type: field_type_from_sdk(&field.data_type),
            mode: Some(
                field
                    .mode
                    .as_ref()
                    .map(mode_from_sdk)
                    .unwrap_or(FieldMode::Nullable),
            ),
        })
        .collect();
    Schema::new(fields)
}

pub fn schema_to_sdk(schema: &Schema) -> TableSchema {
    TableSchema {
        fields: schema
            .fields()
            .iter()
            .map(|field| TableFieldSchema {
                name: field.name.clone(),
                data_type: field_type_to_sdk(&field.field_type),
                mode: field.mode.map(mode_to_sdk),
                ..Default::default()
            })
            .collect(),
    }
}

/// Builds the named `@parameter` for a query
pub fn query_parameter_to_sdk(parameter: &QueryParameter) -> BqQueryParameter {
    let (parameter_type, value) = match &parameter.value {
        CellValue::Null => (
            parameter
                .null_type
                .as_ref()
                .map_or("STRING", standard_sql_type),
            None,
        ),
        CellValue::Bool(b) => ("BOOL", Some(b.to_string())),
        CellValue::Int(i) => ("INT64", Some(i.to_string())),
        CellValue::Float(f) => ("FLOAT64", Some(f.to_string())),
        CellValue::String(s) => ("STRING", Some(s.clone())),
        CellValue::Timestamp(_) => ("TIMESTAMP", Some(parameter.value.to_string())),
    };

    BqQueryParameter {
        name: Some(parameter.name.clone()),
        parameter_type: QueryParameterType {
            parameter_type: parameter_type.to_string(),
            ..Default::default()
        },
        parameter_value: QueryParameterValue {
            value,
            ..Default::default()
        },
    }
}

/// Maps a schema type tag to its standard SQL parameter type
fn standard_sql_type(field_type: &FieldType) -> &str {
    match field_type {
        FieldType::Integer => "INT64",
        FieldType::Float => "FLOAT64",
        FieldType::Boolean => "BOOL",
        FieldType::String => "STRING",
        FieldType::Timestamp => "TIMESTAMP",
        FieldType::Other(tag) => tag,
    }
}

/// Decodes result rows into a table typed by the result schema
///
/// Cells arrive as strings; INTEGER, FLOAT, BOOLEAN and TIMESTAMP columns are
/// parsed, everything else stays a string. Repeated and record cells are kept as
/// JSON text.
pub fn decode_rows(schema: &Schema, rows: &[Tuple]) -> Result<Table, BigQueryHelperError> {
    let columns = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let values = rows
                .iter()
                .map(|row| match row.f.get(index) {
                    Some(cell) => decode_value(&cell.v, &field.field_type),
                    None => CellValue::Null,
                })
                .collect();
            Column::new(field.name.clone(), values)
        })
        .collect();
    Table::new(columns)
}

fn decode_value(value: &BqValue, field_type: &FieldType) -> CellValue {
    match value {
        BqValue::Null => CellValue::Null,
        BqValue::String(raw) => decode_scalar(raw, field_type),
        other => CellValue::String(value_to_json(other).to_string()),
    }
}

fn decode_scalar(raw: &str, field_type: &FieldType) -> CellValue {
    let decoded = match field_type {
        FieldType::Integer => raw.parse::<i64>().ok().map(CellValue::Int),
        FieldType::Float => raw.parse::<f64>().ok().map(CellValue::Float),
        FieldType::Boolean => match raw {
            "true" => Some(CellValue::Bool(true)),
            "false" => Some(CellValue::Bool(false)),
            _ => None,
        },
        FieldType::Timestamp => parse_epoch_seconds(raw).map(CellValue::Timestamp),
        _ => None,
    };
    decoded.unwrap_or_else(|| CellValue::String(raw.to_string()))
}

/// TIMESTAMP cells are epoch seconds, possibly fractional or in exponent form
fn parse_epoch_seconds(raw: &str) -> Option<DateTime<Utc>> {
    let seconds = raw.parse::<f64>().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_micros((seconds * 1_000_000.0).round() as i64)
}

fn value_to_json(value: &BqValue) -> Value {
    match value {
        BqValue::Null => Value::Null,
        BqValue::String(s) => Value::String(s.clone()),
        BqValue::Array(cells) => Value::Array(cells.iter().map(cell_to_json).collect()),
        BqValue::Struct(tuple) => Value::Array(tuple.f.iter().map(cell_to_json).collect()),
    }
}

fn cell_to_json(cell: &Cell) -> Value {
    value_to_json(&cell.v)
}
