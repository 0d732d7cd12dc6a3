//! # Schema Entity
//!
//! BigQuery テーブルスキーマのドメイン表現

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::BigQueryHelperError;

/// フィールドの型タグ
///
/// 型変換が定義されているのは INTEGER / FLOAT / STRING / BOOLEAN / TIMESTAMP のみで、
/// それ以外のタグは `Other` としてそのまま保持する
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Integer,
    Float,
    String,
    Boolean,
    Timestamp,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Integer => "INTEGER",
            FieldType::Float => "FLOAT",
            FieldType::String => "STRING",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Other(tag) => tag,
        }
    }
}

impl From<&str> for FieldType {
    fn from(tag: &str) -> Self {
        match tag {
            "INTEGER" => FieldType::Integer,
            "FLOAT" => FieldType::Float,
            "STRING" => FieldType::String,
            "BOOLEAN" => FieldType::Boolean,
            "TIMESTAMP" => FieldType::Timestamp,
            other => FieldType::Other(other.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        FieldType::from(tag.as_str())
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// フィールドモード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldMode {
    Nullable,
    Required,
    Repeated,
}

impl FieldMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldMode::Nullable => "NULLABLE",
            FieldMode::Required => "REQUIRED",
            FieldMode::Repeated => "REPEATED",
        }
    }

    fn parse(mode: &str) -> Option<Self> {
        match mode.to_ascii_uppercase().as_str() {
            "NULLABLE" => Some(FieldMode::Nullable),
            "REQUIRED" => Some(FieldMode::Required),
            "REPEATED" => Some(FieldMode::Repeated),
            _ => None,
        }
    }
}

/// スキーマのフィールド定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<FieldMode>,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: FieldMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// テーブルスキーマ
///
/// フィールドの順序を保持し、フィールド名が一意であることを保証する
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    /// フィールドのリストからスキーマを作成
    ///
    /// # Errors
    ///
    /// フィールド名が空、または重複している場合に `InvalidSchema` を返す
    pub fn new(fields: Vec<SchemaField>) -> Result<Self, BigQueryHelperError> {
        let mut seen = HashSet::new();
        for (index, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(BigQueryHelperError::InvalidSchema(format!(
                    "field #{} has an empty name",
                    index
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(BigQueryHelperError::InvalidSchema(format!(
                    "duplicate field name `{}` at #{}",
                    field.name, index
                )));
            }
        }
        Ok(Self { fields })
    }

    /// 名前が一意なフィールドからスキーマを作成
    ///
    /// 名前の一意性は呼び出し側が保証する。テーブルの列から組み立てる場合に使う。
    pub(crate) fn from_unique_fields(fields: Vec<SchemaField>) -> Self {
        debug_assert!(
            {
                let mut seen = HashSet::new();
                fields.iter().all(|f| seen.insert(f.name.as_str()))
            },
            "schema field names must be unique"
        );
        Self { fields }
    }

    /// JSON 配列（`[{"name": ..., "type": ..., "mode": ...}, ...]`）からスキーマを作成
    ///
    /// # Errors
    ///
    /// 配列でない場合、要素がオブジェクトでない場合、`name` / `type` が欠けている場合に
    /// 該当要素を示すメッセージ付きで `InvalidSchema` を返す
    pub fn from_json(value: &Value) -> Result<Self, BigQueryHelperError> {
        let entries = value.as_array().ok_or_else(|| {
            BigQueryHelperError::InvalidSchema("schema must be a JSON array of fields".to_string())
        })?;

        let mut fields = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let object = entry.as_object().ok_or_else(|| {
                BigQueryHelperError::InvalidSchema(format!("field #{} is not an object", index))
            })?;

            let name = required_str(object, "name", index)?;
            let field_type = required_str(object, "type", index)?;
            let mode = match object.get("mode") {
                None | Some(Value::Null) => None,
                Some(Value::String(m)) => Some(FieldMode::parse(m).ok_or_else(|| {
                    BigQueryHelperError::InvalidSchema(format!(
                        "field #{} (`{}`) has unknown mode `{}`",
                        index, name, m
                    ))
                })?),
                Some(_) => {
                    return Err(BigQueryHelperError::InvalidSchema(format!(
                        "field #{} (`{}`) has a non-string mode",
                        index, name
                    )))
                }
            };

            fields.push(SchemaField {
                name: name.to_string(),
                field_type: FieldType::from(field_type),
                mode,
            });
        }

        Self::new(fields)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn required_str<'a>(
    object: &'a serde_json::Map<String, Value>,
    key: &str,
    index: usize,
) -> Result<&'a str, BigQueryHelperError> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(BigQueryHelperError::InvalidSchema(format!(
            "field #{} has a non-string `{}`",
            index, key
        ))),
        None => Err(BigQueryHelperError::InvalidSchema(format!(
            "field #{} is missing required key `{}`",
            index, key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_valid() {
        let schema = Schema::from_json(&json!([
            {"name": "id", "type": "INTEGER", "mode": "REQUIRED"},
            {"name": "name", "type": "STRING"},
            {"name": "payload", "type": "JSON"}
        ]))
        .unwrap();

        assert_eq!(schema.names(), vec!["id", "name", "payload"]);
        assert_eq!(schema.fields()[0].field_type, FieldType::Integer);
        assert_eq!(schema.fields()[0].mode, Some(FieldMode::Required));
        assert_eq!(schema.fields()[1].mode, None);
        assert_eq!(
            schema.fields()[2].field_type,
            FieldType::Other("JSON".to_string())
        );
    }

    #[test]
    fn test_from_json_missing_type() {
        let err = Schema::from_json(&json!([{"name": "id"}])).unwrap_err();
        assert_eq!(
            err,
            BigQueryHelperError::InvalidSchema("field #0 is missing required key `type`".to_string())
        );
    }

    #[test]
    fn test_from_json_non_object_entry() {
        let err = Schema::from_json(&json!([{"name": "id", "type": "STRING"}, "oops"])).unwrap_err();
        assert_eq!(
            err,
            BigQueryHelperError::InvalidSchema("field #1 is not an object".to_string())
        );
    }

    #[test]
    fn test_from_json_not_an_array() {
        let err = Schema::from_json(&json!({"name": "id"})).unwrap_err();
        assert!(matches!(err, BigQueryHelperError::InvalidSchema(_)));
    }

    #[test]
    fn test_from_json_unknown_mode() {
        let err = Schema::from_json(&json!([{"name": "id", "type": "STRING", "mode": "SOMETIMES"}]))
            .unwrap_err();
        assert!(err.to_string().contains("SOMETIMES"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Schema::new(vec![
            SchemaField::new("id", FieldType::Integer),
            SchemaField::new("id", FieldType::String),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate field name `id`"));
    }

    #[test]
    fn test_field_type_tags_are_case_sensitive() {
        assert_eq!(FieldType::from("INTEGER"), FieldType::Integer);
        assert_eq!(
            FieldType::from("integer"),
            FieldType::Other("integer".to_string())
        );
    }

    #[test]
    fn test_to_json_roundtrip_shape() {
        let schema = Schema::new(vec![
            SchemaField::new("id", FieldType::Integer).with_mode(FieldMode::Nullable),
            SchemaField::new("name", FieldType::String),
        ])
        .unwrap();

        assert_eq!(
            schema.to_json(),
            json!([
                {"name": "id", "type": "INTEGER", "mode": "NULLABLE"},
                {"name": "name", "type": "STRING"}
            ])
        );
    }
}
