//! # Warehouse Repository Trait
//!
//! データウェアハウス（BigQuery）への操作を抽象化

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::entities::schema::{FieldType, Schema};
use crate::domain::entities::table::{CellValue, JsonRow, Table};
use crate::domain::entities::table_id::TableId;

/// 名前付きクエリパラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameter {
    pub name: String,
    pub value: CellValue,
    /// 値が `Null` のときにバインドする型（未指定なら STRING）
    pub null_type: Option<FieldType>,
}

impl QueryParameter {
    pub fn new(name: impl Into<String>, value: CellValue) -> Self {
        Self {
            name: name.into(),
            value,
            null_type: None,
        }
    }

    /// 型付きの NULL パラメータを作成
    ///
    /// BigQuery は STRING の NULL を他の型の列に代入できないため、
    /// 代入先の列の型を指定する
    pub fn typed_null(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            value: CellValue::Null,
            null_type: Some(field_type),
        }
    }
}

/// クエリ結果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    /// 結果行（結果スキーマの型で復元済み）
    pub table: Table,
    /// 結果スキーマ（DML の場合は空）
    pub schema: Schema,
    /// DML で影響を受けた行数
    pub num_dml_affected_rows: Option<i64>,
    /// 実行されたジョブのID
    pub job_id: String,
}

/// ストリーミング挿入の行エラー
#[derive(Debug, Clone, PartialEq)]
pub struct RowInsertError {
    /// リクエスト内の行番号
    pub index: usize,
    /// エラーメッセージ
    pub messages: Vec<String>,
}

impl fmt::Display for RowInsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.index, self.messages.join("; "))
    }
}

/// ウェアハウスリポジトリ
///
/// クエリ実行、行の挿入、テーブル管理を担当するリポジトリ
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    /// クエリを実行し、完了まで待って全結果を返す
    ///
    /// # Arguments
    ///
    /// * `project_id` - ジョブを実行するプロジェクト
    /// * `sql` - 実行する SQL
    /// * `parameters` - 名前付きパラメータ
    async fn query(
        &self,
        project_id: &str,
        sql: &str,
        parameters: &[QueryParameter],
    ) -> Result<QueryResult>;

    /// 行をストリーミング挿入する
    ///
    /// # Returns
    ///
    /// 行ごとのエラー（空なら成功）
    async fn insert_rows(&self, table: &TableId, rows: &[JsonRow]) -> Result<Vec<RowInsertError>>;

    /// テーブルのスキーマを取得する
    async fn get_schema(&self, table: &TableId) -> Result<Schema>;

    /// テーブルが存在するか確認する
    async fn table_exists(&self, table: &TableId) -> Result<bool>;

    /// スキーマを指定してテーブルを作成する
    async fn create_table(&self, table: &TableId, schema: &Schema) -> Result<()>;

    /// テーブルを削除する
    async fn delete_table(&self, table: &TableId) -> Result<()>;

    /// 行をバッチに分割してアップロードする
    ///
    /// # Returns
    ///
    /// アップロードされた行数
    async fn upload_rows(&self, table: &TableId, rows: Vec<JsonRow>) -> Result<usize>;
}
