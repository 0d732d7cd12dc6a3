//! JSONL Table Repository Implementation
//!
//! TableFileRepositoryのファイルシステム実装

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::entities::schema::Schema;
use crate::domain::entities::table::{JsonRow, Table};
use crate::domain::repositories::table_file_repository::TableFileRepository;

/// JSON Lines ファイルベースのテーブルリポジトリ
///
/// テーブルは1行1オブジェクトの JSONL、スキーマはフィールド定義の JSON 配列として読む
pub struct JsonlTableRepository;

impl JsonlTableRepository {
    /// 新しいリポジトリを作成
    pub fn new() -> Self {
        Self
    }

    fn expand(path: &Path) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
    }

    /// JSONL ファイルをパースする（内部実装）
    ///
    /// オブジェクトでない行やパースできない行は警告を出してスキップする
    fn read_rows_internal(file_path: &Path) -> Result<Vec<JsonRow>> {
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read table file: {}", file_path.display()))?;

        let mut rows = Vec::new();

        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(row)) => rows.push(row),
                Ok(_) => {
                    warn!(
                        "Line {} in {} is not a JSON object, skipping",
                        line_num + 1,
                        file_path.display()
                    );
                }
                Err(e) => {
                    warn!(
                        "Failed to parse line {} in {}: {}",
                        line_num + 1,
                        file_path.display(),
                        e
                    );
                }
            }
        }

        info!("Read {} rows from {}", rows.len(), file_path.display());

        Ok(rows)
    }

    fn read_schema_internal(file_path: &Path) -> Result<Schema> {
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read schema file: {}", file_path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Schema file is not valid JSON: {}", file_path.display()))?;
        Ok(Schema::from_json(&value)?)
    }
}

#[async_trait]
impl TableFileRepository for JsonlTableRepository {
    async fn read_table(&self, path: &Path) -> Result<Table> {
        let rows = self.read_rows(path).await?;
        Ok(Table::from_json_rows(&rows))
    }

    async fn read_rows(&self, path: &Path) -> Result<Vec<JsonRow>> {
        // 非同期なので、tokio::task::spawn_blockingでラップ
        let file_path = Self::expand(path);
        tokio::task::spawn_blocking(move || Self::read_rows_internal(&file_path))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }

    async fn read_schema(&self, path: &Path) -> Result<Schema> {
        let file_path = Self::expand(path);
        tokio::task::spawn_blocking(move || Self::read_schema_internal(&file_path))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }
}

impl Default for JsonlTableRepository {
    fn default() -> Self {
        Self::new()
    }
}
