//! # Schema Inference
//!
//! スキーマ未指定のアップロード時に、テーブルの値からスキーマを生成する

use crate::domain::entities::schema::{FieldMode, FieldType, Schema, SchemaField};
use crate::domain::entities::table::{CellValue, Table};

pub struct SchemaInference;

impl SchemaInference {
    /// テーブルの各列から BigQuery スキーマを推定する
    ///
    /// Null を除いた値がすべて同じ型ならその型、整数と小数の混在は FLOAT、
    /// それ以外（全て Null を含む）は STRING。モードは常に NULLABLE。
    pub fn infer_schema(table: &Table) -> Schema {
        let fields = table
            .columns()
            .iter()
            .map(|column| {
                SchemaField::new(column.name.clone(), Self::infer_type(&column.values))
                    .with_mode(FieldMode::Nullable)
            })
            .collect();

        // フィールドはテーブルの列と一対一なので名前は一意
        Schema::from_unique_fields(fields)
    }

    fn infer_type(values: &[CellValue]) -> FieldType {
        let mut inferred: Option<FieldType> = None;

        for value in values {
            let current = match value {
                CellValue::Null => continue,
                CellValue::Bool(_) => FieldType::Boolean,
                CellValue::Int(_) => FieldType::Integer,
                CellValue::Float(_) => FieldType::Float,
                CellValue::Timestamp(_) => FieldType::Timestamp,
                CellValue::String(_) => return FieldType::String,
            };

            inferred = match (inferred, current) {
                (None, t) => Some(t),
                (Some(a), b) if a == b => Some(a),
                (Some(FieldType::Integer), FieldType::Float)
                | (Some(FieldType::Float), FieldType::Integer) => Some(FieldType::Float),
                _ => return FieldType::String,
            };
        }

        inferred.unwrap_or(FieldType::String)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::table::Column;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_infer_schema() {
        let table = Table::new(vec![
            Column::new("id", vec![CellValue::Int(1), CellValue::Null]),
            Column::new("score", vec![CellValue::Int(1), CellValue::Float(0.5)]),
            Column::new("active", vec![CellValue::Bool(true), CellValue::Bool(false)]),
            Column::new("at", vec![CellValue::Timestamp(Utc::now()), CellValue::Null]),
            Column::new("name", vec![CellValue::String("a".into()), CellValue::Int(2)]),
            Column::new("empty", vec![CellValue::Null, CellValue::Null]),
            Column::new("mixed", vec![CellValue::Bool(true), CellValue::Int(2)]),
        ])
        .unwrap();

        let schema = SchemaInference::infer_schema(&table);
        let types: Vec<&FieldType> = schema.fields().iter().map(|f| &f.field_type).collect();

        assert_eq!(
            types,
            vec![
                &FieldType::Integer,
                &FieldType::Float,
                &FieldType::Boolean,
                &FieldType::Timestamp,
                &FieldType::String,
                &FieldType::String,
                &FieldType::String,
            ]
        );
        assert!(schema
            .fields()
            .iter()
            .all(|f| f.mode == Some(FieldMode::Nullable)));
    }

    #[test]
    fn test_infer_schema_keeps_one_field_per_column() {
        // 空文字の列名も捨てずにフィールドにする（拒否は BigQuery 側に任せる）
        let rows = vec![json!({"": 1, "name": "a"}).as_object().unwrap().clone()];
        let table = Table::from_json_rows(&rows);

        let schema = SchemaInference::infer_schema(&table);

        assert_eq!(schema.names(), vec!["", "name"]);
        assert_eq!(schema.field("").unwrap().field_type, FieldType::Integer);
    }

    #[test]
    fn test_infer_schema_empty_table() {
        let schema = SchemaInference::infer_schema(&Table::default());
        assert!(schema.is_empty());
    }
}
