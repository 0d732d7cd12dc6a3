//! # Table Entity
//!
//! 列指向の表形式データ（DataFrame 相当）

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::domain::errors::BigQueryHelperError;

/// JSON オブジェクトで表現された1行
pub type JsonRow = Map<String, Value>;

/// セルの値
///
/// 型変換前の列は異なるバリアントが混在してもよい
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// JSON 値から変換する
    ///
    /// 配列・オブジェクトは JSON テキストの文字列として保持する
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Int(i),
                None => n.as_f64().map(CellValue::Float).unwrap_or(CellValue::Null),
            },
            Value::String(s) => CellValue::String(s.clone()),
            other => CellValue::String(other.to_string()),
        }
    }

    /// BigQuery の insertAll に渡す JSON 値に変換する
    ///
    /// NaN / 無限大は JSON で表現できないため null になる
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Int(i) => Value::from(*i),
            CellValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            CellValue::String(s) => Value::String(s.clone()),
            CellValue::Timestamp(ts) => Value::String(format_timestamp(ts)),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "null"),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(i) => write!(f, "{}", i),
            // Debug keeps the fractional part ("2.0") so floats stay distinguishable
            CellValue::Float(v) => write!(f, "{:?}", v),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Timestamp(ts) => write!(f, "{}", format_timestamp(ts)),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// 名前付きの列
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 表形式データ
///
/// 列の順序を保持し、全列の行数が揃っていることを保証する
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// 列のリストからテーブルを作成
    ///
    /// # Errors
    ///
    /// 列名が重複している場合、または列の長さが揃っていない場合にエラーを返す
    pub fn new(columns: Vec<Column>) -> Result<Self, BigQueryHelperError> {
        Self::validate(&columns)?;
        Ok(Self { columns })
    }

    /// 既に一意で長さの揃った列からテーブルを作成
    ///
    /// 不変条件（列名の一意性と列長の一致）は呼び出し側が保証する。
    /// 既存テーブルから列を選び出す場合のように、崩れようがない場面でのみ使う。
    pub(crate) fn from_validated_columns(columns: Vec<Column>) -> Self {
        debug_assert!(
            Self::validate(&columns).is_ok(),
            "columns must have unique names and equal lengths"
        );
        Self { columns }
    }

    fn validate(columns: &[Column]) -> Result<(), BigQueryHelperError> {
        let mut seen = HashSet::new();
        for column in columns {
            if !seen.insert(column.name.as_str()) {
                return Err(BigQueryHelperError::InvalidTable(format!(
                    "duplicate column `{}`",
                    column.name
                )));
            }
        }

        if let Some(first) = columns.first() {
            if let Some(bad) = columns.iter().find(|c| c.len() != first.len()) {
                return Err(BigQueryHelperError::InvalidTable(format!(
                    "column `{}` has {} rows, expected {}",
                    bad.name,
                    bad.len(),
                    first.len()
                )));
            }
        }

        Ok(())
    }

    /// JSON 行のリストからテーブルを作成
    ///
    /// 列は最初に出現した順に並び、行に存在しないキーは `Null` で埋める
    pub fn from_json_rows(rows: &[JsonRow]) -> Self {
        let mut names: Vec<String> = Vec::new();
        let mut known = HashSet::new();
        for row in rows {
            for key in row.keys() {
                if known.insert(key.clone()) {
                    names.push(key.clone());
                }
            }
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let values = rows
                    .iter()
                    .map(|row| row.get(&name).map(CellValue::from_json).unwrap_or(CellValue::Null))
                    .collect();
                Column::new(name, values)
            })
            .collect();

        Self { columns }
    }

    /// 行ごとの JSON オブジェクトに変換する
    pub fn to_json_rows(&self) -> Vec<JsonRow> {
        (0..self.num_rows())
            .map(|i| {
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values[i].to_json()))
                    .collect()
            })
            .collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }
}
