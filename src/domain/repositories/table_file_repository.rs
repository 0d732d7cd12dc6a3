//! # Table File Repository Trait
//!
//! ローカルファイルからのテーブル・スキーマ読み込みを抽象化

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::domain::entities::schema::Schema;
use crate::domain::entities::table::{JsonRow, Table};

/// テーブルファイルリポジトリ
#[async_trait]
pub trait TableFileRepository: Send + Sync {
    /// テーブルを読み込む
    async fn read_table(&self, path: &Path) -> Result<Table>;

    /// 行（JSON オブジェクト）をそのまま読み込む
    async fn read_rows(&self, path: &Path) -> Result<Vec<JsonRow>>;

    /// スキーマを読み込む
    ///
    /// # Errors
    ///
    /// ファイルが読めない場合、またはスキーマが不正な場合にエラーを返す
    async fn read_schema(&self, path: &Path) -> Result<Schema>;
}
