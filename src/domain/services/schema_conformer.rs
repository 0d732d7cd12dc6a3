//! # Schema Conformer
//!
//! テーブルをスキーマに適合させるドメインサービス

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::domain::entities::schema::{FieldType, Schema};
use crate::domain::entities::table::{CellValue, Column, Table};

/// タイムゾーン付き日時のフォーマット
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// タイムゾーンなし日時のフォーマット（UTCとして解釈）
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

/// 日付のみのフォーマット（UTCの0時として解釈）
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// スキーマ適合サービス
///
/// 任意のテーブルを、列構成と値の型が宣言されたスキーマに一致するテーブルへ変換する。
/// 値単位の変換失敗は例外にせず `Null` に落とす。
pub struct SchemaConformer;

impl SchemaConformer {
    /// テーブルをスキーマに適合させる
    ///
    /// - スキーマに含まれる列だけを、入力テーブルの列順のまま残す
    /// - スキーマにあって入力にない列は作らない
    /// - 残した列の値をスキーマの型タグに従って変換する
    ///
    /// # Arguments
    ///
    /// * `table` - 入力テーブル
    /// * `schema` - 適合先のスキーマ
    ///
    /// # Returns
    ///
    /// 新しいテーブル（入力は変更しない）
    pub fn conform(table: &Table, schema: &Schema) -> Table {
        let types: HashMap<&str, &FieldType> = schema
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), &f.field_type))
            .collect();

        let columns: Vec<Column> = table
            .columns()
            .iter()
            .filter_map(|column| {
                types.get(column.name.as_str()).map(|field_type| {
                    Column::new(
                        column.name.clone(),
                        Self::cast_column(&column.values, field_type),
                    )
                })
            })
            .collect();

        // 入力テーブルから列を選ぶだけなので、列名の一意性と列長は保たれる
        Table::from_validated_columns(columns)
    }

    /// 列の値を型タグに従って変換する
    pub fn cast_column(values: &[CellValue], field_type: &FieldType) -> Vec<CellValue> {
        match field_type {
            FieldType::Integer => values
                .iter()
                .map(|v| to_integer(v).map(CellValue::Int).unwrap_or(CellValue::Null))
                .collect(),
            FieldType::Float => values
                .iter()
                .map(|v| to_float(v).map(CellValue::Float).unwrap_or(CellValue::Null))
                .collect(),
            FieldType::String => values
                .iter()
                .map(|v| match v {
                    CellValue::String(s) => CellValue::String(s.clone()),
                    other => CellValue::String(other.to_string()),
                })
                .collect(),
            FieldType::Boolean => values.iter().map(|v| CellValue::Bool(is_truthy(v))).collect(),
            FieldType::Timestamp => values
                .iter()
                .map(|v| to_timestamp(v).map(CellValue::Timestamp).unwrap_or(CellValue::Null))
                .collect(),
            FieldType::Other(_) => values.to_vec(),
        }
    }
}

/// 整数への変換
///
/// 小数部を持つ数値は情報を失うため変換しない
fn to_integer(value: &CellValue) -> Option<i64> {
    match value {
        CellValue::Int(i) => Some(*i),
        CellValue::Bool(b) => Some(i64::from(*b)),
        CellValue::Float(f) => integral(*f),
        CellValue::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        CellValue::Null | CellValue::Timestamp(_) => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn to_float(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Float(f) => Some(*f),
        CellValue::Int(i) => Some(*i as f64),
        CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        CellValue::String(s) => s.trim().parse::<f64>().ok(),
        CellValue::Null | CellValue::Timestamp(_) => None,
    }
}

/// 真偽値への変換
///
/// 空でない文字列はすべて true になる（`"False"` や `"0"` も true）
fn is_truthy(value: &CellValue) -> bool {
    match value {
        CellValue::Null => false,
        CellValue::Bool(b) => *b,
        CellValue::Int(i) => *i != 0,
        CellValue::Float(f) => *f != 0.0,
        CellValue::String(s) => !s.is_empty(),
        CellValue::Timestamp(_) => true,
    }
}

/// 日時への変換
///
/// 数値はエポックからのナノ秒として解釈する
fn to_timestamp(value: &CellValue) -> Option<DateTime<Utc>> {
    match value {
        CellValue::Timestamp(ts) => Some(*ts),
        CellValue::Int(i) => Some(DateTime::from_timestamp_nanos(*i)),
        CellValue::Float(f) => integral(f.trunc()).map(DateTime::from_timestamp_nanos),
        CellValue::String(s) => parse_timestamp(s),
        CellValue::Null | CellValue::Bool(_) => None,
    }
}

/// 日時文字列を解析する
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    let s = s.strip_suffix(" UTC").unwrap_or(s);

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}
