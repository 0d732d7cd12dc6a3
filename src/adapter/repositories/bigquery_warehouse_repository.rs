//! BigQuery Warehouse Repository Implementation
//!
//! WarehouseRepositoryのBigQuery実装

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use google_cloud_bigquery::http::job::get_query_results::GetQueryResultsRequest;
use google_cloud_bigquery::http::job::query::QueryRequest;
use google_cloud_bigquery::http::tabledata::insert_all::InsertAllRequest;
use log::debug;
use std::sync::Arc;

use crate::adapter::bigquery::batch_uploader::{prepare_rows, upload_to_bigquery};
use crate::adapter::bigquery::client::BigQueryService;
use crate::adapter::bigquery::models::{
    decode_rows, query_parameter_to_sdk, schema_from_sdk, schema_to_sdk,
};
use crate::adapter::config::Config;
use crate::domain::entities::schema::Schema;
use crate::domain::entities::table::JsonRow;
use crate::domain::entities::table_id::TableId;
use crate::domain::repositories::warehouse_repository::{
    QueryParameter, QueryResult, RowInsertError, WarehouseRepository,
};

/// ジョブ実行とアップロードの設定
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseSettings {
    /// ジョブを実行するロケーション
    pub location: String,
    /// insertAll 1回あたりの最大行数
    pub upload_batch_size: usize,
    /// jobs.query / getQueryResults の待ち時間（ミリ秒）
    pub query_timeout_ms: i64,
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            location: "US".to_string(),
            upload_batch_size: 500,
            query_timeout_ms: 10_000,
        }
    }
}

impl From<&Config> for WarehouseSettings {
    fn from(config: &Config) -> Self {
        Self {
            location: config.location.clone(),
            upload_batch_size: config.upload_batch_size,
            query_timeout_ms: config.query_timeout_ms,
        }
    }
}

/// BigQueryウェアハウスリポジトリ
pub struct BigQueryWarehouseRepository {
    service: Arc<dyn BigQueryService>,
    settings: WarehouseSettings,
}

impl BigQueryWarehouseRepository {
    /// 新しいリポジトリを作成
    pub fn new(service: Arc<dyn BigQueryService>, settings: WarehouseSettings) -> Self {
        Self { service, settings }
    }

    fn build_query_request(&self, sql: &str, parameters: &[QueryParameter]) -> QueryRequest {
        QueryRequest {
            query: sql.to_string(),
            use_legacy_sql: false,
            parameter_mode: (!parameters.is_empty()).then(|| "NAMED".to_string()),
            query_parameters: parameters.iter().map(query_parameter_to_sdk).collect(),
            location: self.settings.location.clone(),
            timeout_ms: Some(self.settings.query_timeout_ms),
            ..Default::default()
        }
    }

    fn results_request(&self, location: &Option<String>, page_token: Option<String>) -> GetQueryResultsRequest {
        GetQueryResultsRequest {
            page_token,
            timeout_ms: Some(self.settings.query_timeout_ms),
            location: location.clone(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl WarehouseRepository for BigQueryWarehouseRepository {
    async fn query(
        &self,
        project_id: &str,
        sql: &str,
        parameters: &[QueryParameter],
    ) -> Result<QueryResult> {
        let request = self.build_query_request(sql, parameters);
        let mut page = self.service.query(project_id, &request).await?;

        let job_id = page.job_id.clone();
        let location = page
            .location
            .clone()
            .or_else(|| Some(self.settings.location.clone()));

        // 完了するまで getQueryResults で待つ
        while !page.job_complete {
            debug!("Job {} is still running, waiting...", job_id);
            page = self
                .service
                .get_query_results(project_id, &job_id, &self.results_request(&location, None))
                .await?;
        }

        let num_dml_affected_rows = page.num_dml_affected_rows;
        let sdk_schema = page.schema.take();
        let mut rows = std::mem::take(&mut page.rows);
        let mut page_token = page.page_token.take();

        while let Some(token) = page_token {
            debug!("Fetching next page of job {} ({} rows so far)", job_id, rows.len());
            let next = self
                .service
                .get_query_results(
                    project_id,
                    &job_id,
                    &self.results_request(&location, Some(token)),
                )
                .await?;
            rows.extend(next.rows);
            page_token = next.page_token;
        }

        let schema = match sdk_schema {
            Some(schema) => schema_from_sdk(&schema)?,
            None => Schema::default(),
        };
        let table = decode_rows(&schema, &rows)?;

        Ok(QueryResult {
            table,
            schema,
            num_dml_affected_rows,
            job_id,
        })
    }

    async fn insert_rows(&self, table: &TableId, rows: &[JsonRow]) -> Result<Vec<RowInsertError>> {
        let request = InsertAllRequest {
            rows: prepare_rows(rows),
            skip_invalid_rows: None,
            ignore_unknown_values: None,
            template_suffix: None,
            trace_id: None,
        };
        self.service.insert(table, &request).await
    }

    async fn get_schema(&self, table: &TableId) -> Result<Schema> {
        match self.service.get_table_schema(table).await? {
            Some(schema) => Ok(schema_from_sdk(&schema)?),
            None => Err(anyhow!("Table not found: {}", table)),
        }
    }

    async fn table_exists(&self, table: &TableId) -> Result<bool> {
        Ok(self.service.get_table_schema(table).await?.is_some())
    }

    async fn create_table(&self, table: &TableId, schema: &Schema) -> Result<()> {
        self.service.create_table(table, schema_to_sdk(schema)).await
    }

    async fn delete_table(&self, table: &TableId) -> Result<()> {
        self.service.delete_table(table).await
    }

    async fn upload_rows(&self, table: &TableId, rows: Vec<JsonRow>) -> Result<usize> {
        upload_to_bigquery(
            self.service.as_ref(),
            table,
            rows,
            self.settings.upload_batch_size,
        )
        .await
    }
}
