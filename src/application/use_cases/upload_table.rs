//! # Upload Table Use Case
//!
//! テーブル（DataFrame 相当）を BigQuery にアップロードするユースケース

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use log::{debug, info};

use crate::application::dto::upload_options::{IfExists, UploadOptions};
use crate::domain::entities::schema::Schema;
use crate::domain::entities::table::Table;
use crate::domain::entities::table_id::TableId;
use crate::domain::errors::BigQueryHelperError;
use crate::domain::repositories::warehouse_repository::WarehouseRepository;
use crate::domain::services::schema_conformer::SchemaConformer;
use crate::domain::services::schema_inference::SchemaInference;

/// アップロード準備の結果
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedUpload {
    /// スキーマ適合後のテーブル
    pub table: Table,
    /// テーブル作成に使うスキーマ
    pub schema: Schema,
}

/// アップロード結果のサマリー
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSummary {
    /// アップロードされた行数
    pub uploaded_rows: usize,
    /// テーブルを新規作成したかどうか
    pub created_table: bool,
}

/// 作成直後のテーブルが見えるまで確認する最大回数
pub const TABLE_READY_MAX_ATTEMPTS: u32 = 10;

/// 作成直後のテーブル確認の間隔
pub const TABLE_READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// テーブルアップロードユースケース
///
/// スキーマ指定時はテーブルをスキーマに適合させ、`if_exists` に従って
/// 宛先テーブルを用意してから行をアップロードする。
/// テーブルを作成（または作り直し）した場合は、存在確認が通るまで待ってから送信する。
pub struct UploadTableUseCase<R: WarehouseRepository + ?Sized> {
    warehouse_repository: Arc<R>,
    ready_poll_interval: Duration,
}

impl<R: WarehouseRepository + ?Sized> UploadTableUseCase<R> {
    /// 新しいユースケースを作成
    pub fn new(warehouse_repository: Arc<R>) -> Self {
        Self {
            warehouse_repository,
            ready_poll_interval: TABLE_READY_POLL_INTERVAL,
        }
    }

    /// 作成直後のテーブル確認の間隔を変更する
    pub fn with_ready_poll_interval(mut self, interval: Duration) -> Self {
        self.ready_poll_interval = interval;
        self
    }

    /// アップロードするテーブルとスキーマを準備する（I/O なし）
    ///
    /// スキーマ未指定の場合はテーブルの値からスキーマを推定し、
    /// 値も推定したスキーマに適合させる。送信する値の型は常に作成するテーブル定義と一致する
    pub fn prepare(table: &Table, options: &UploadOptions) -> PreparedUpload {
        match options.conform_schema() {
            Some(schema) => PreparedUpload {
                table: SchemaConformer::conform(table, schema),
                schema: schema.clone(),
            },
            None => {
                let schema = SchemaInference::infer_schema(table);
                PreparedUpload {
                    table: SchemaConformer::conform(table, &schema),
                    schema,
                }
            }
        }
    }

    /// テーブルをアップロードする
    ///
    /// # Arguments
    ///
    /// * `table` - アップロードするテーブル
    /// * `table_id` - 宛先テーブル
    /// * `options` - `if_exists` とスキーマ
    ///
    /// # Errors
    ///
    /// `if_exists = fail` で宛先が存在する場合は `TableAlreadyExists`、
    /// テーブル操作やアップロードが失敗した場合はそのエラーを返す
    pub async fn execute(
        &self,
        table: &Table,
        table_id: &TableId,
        options: &UploadOptions,
    ) -> Result<UploadSummary> {
        let prepared = Self::prepare(table, options);
        let created_table = self
            .prepare_destination(table_id, &prepared.schema, options.if_exists)
            .await?;
        if created_table {
            self.wait_until_ready(table_id).await?;
        }

        let rows = prepared.table.to_json_rows();
        let uploaded_rows = if rows.is_empty() {
            0
        } else {
            self.warehouse_repository.upload_rows(table_id, rows).await?
        };

        info!("Successfully uploaded {} rows to {}", uploaded_rows, table_id);

        Ok(UploadSummary {
            uploaded_rows,
            created_table,
        })
    }

    /// `if_exists` に従って宛先テーブルを用意する
    ///
    /// # Returns
    ///
    /// テーブルを新規作成した場合に `true`
    async fn prepare_destination(
        &self,
        table_id: &TableId,
        schema: &Schema,
        if_exists: IfExists,
    ) -> Result<bool> {
        let exists = self.warehouse_repository.table_exists(table_id).await?;

        match (exists, if_exists) {
            (true, IfExists::Append) => Ok(false),
            (true, IfExists::Fail) => {
                Err(BigQueryHelperError::TableAlreadyExists(table_id.to_string()).into())
            }
            (true, IfExists::Replace) => {
                info!("Replacing existing table {}", table_id);
                self.warehouse_repository.delete_table(table_id).await?;
                self.warehouse_repository
                    .create_table(table_id, schema)
                    .await?;
                Ok(true)
            }
            (false, _) => {
                info!("Creating table {} with {} fields", table_id, schema.len());
                self.warehouse_repository
                    .create_table(table_id, schema)
                    .await?;
                Ok(true)
            }
        }
    }

    /// 作成したテーブルが存在確認で見えるまで待つ
    ///
    /// # Errors
    ///
    /// `TABLE_READY_MAX_ATTEMPTS` 回確認しても見えない場合はエラーを返す
    async fn wait_until_ready(&self, table_id: &TableId) -> Result<()> {
        for attempt in 1..=TABLE_READY_MAX_ATTEMPTS {
            if self.warehouse_repository.table_exists(table_id).await? {
                debug!("Table {} is ready after {} check(s)", table_id, attempt);
                return Ok(());
            }
            tokio::time::sleep(self.ready_poll_interval).await;
        }

        bail!(
            "Table {} is still not visible after {} checks",
            table_id,
            TABLE_READY_MAX_ATTEMPTS
        )
    }
}
