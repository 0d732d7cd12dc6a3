//! BigQuery Client Abstractions
//!
//! クライアントの抽象化と実装

use anyhow::{Context, Result};
use async_trait::async_trait;
use google_cloud_bigquery::client::Client;
use google_cloud_bigquery::http::job::get_query_results::GetQueryResultsRequest;
use google_cloud_bigquery::http::job::query::QueryRequest;
use google_cloud_bigquery::http::table::{Table as BqTable, TableReference, TableSchema};
use google_cloud_bigquery::http::tabledata::insert_all::InsertAllRequest;

#[cfg(test)]
use mockall::automock;

use super::errors::is_not_found;
use super::models::QueryPage;
use crate::domain::entities::table::JsonRow;
use crate::domain::entities::table_id::TableId;
use crate::domain::repositories::warehouse_repository::RowInsertError;

/// Trait for the BigQuery REST calls this crate makes
/// This enables mocking in tests while using the real client in production
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BigQueryService: Send + Sync {
    /// Start a query job (`jobs.query`)
    async fn query(&self, project_id: &str, request: &QueryRequest) -> Result<QueryPage>;

    /// Fetch status and rows of a query job (`jobs.getQueryResults`)
    async fn get_query_results(
        &self,
        project_id: &str,
        job_id: &str,
        request: &GetQueryResultsRequest,
    ) -> Result<QueryPage>;

    /// Insert rows into a BigQuery table (`tabledata.insertAll`)
    ///
    /// Returns the per-row errors reported by the service.
    async fn insert(
        &self,
        table: &TableId,
        request: &InsertAllRequest<JsonRow>,
    ) -> Result<Vec<RowInsertError>>;

    /// Fetch the schema of a table, `None` if the table does not exist
    async fn get_table_schema(&self, table: &TableId) -> Result<Option<TableSchema>>;

    async fn create_table(&self, table: &TableId, schema: TableSchema) -> Result<()>;

    async fn delete_table(&self, table: &TableId) -> Result<()>;
}

/// BigQuery client that owns the Client instance
pub struct OwnedBigQueryClient {
    client: Client,
}

impl OwnedBigQueryClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BigQueryService for OwnedBigQueryClient {
    async fn query(&self, project_id: &str, request: &QueryRequest) -> Result<QueryPage> {
        let response = self
            .client
            .job()
            .query(project_id, request)
            .await
            .context("BigQuery query failed")?;
        Ok(response.into())
    }

    async fn get_query_results(
        &self,
        project_id: &str,
        job_id: &str,
        request: &GetQueryResultsRequest,
    ) -> Result<QueryPage> {
        let response = self
            .client
            .job()
            .get_query_results(project_id, job_id, request)
            .await
            .with_context(|| format!("Failed to get results of job {}", job_id))?;
        Ok(response.into())
    }

    async fn insert(
        &self,
        table: &TableId,
        request: &InsertAllRequest<JsonRow>,
    ) -> Result<Vec<RowInsertError>> {
        let response = self
            .client
            .tabledata()
            .insert(&table.project_id, &table.dataset_id, &table.table_id, request)
            .await
            .context("BigQuery insert failed")?;

        Ok(response
            .insert_errors
            .unwrap_or_default()
            .into_iter()
            .map(|error| RowInsertError {
                index: error.index.max(0) as usize,
                messages: error.errors.into_iter().map(|m| m.message).collect(),
            })
            .collect())
    }

    async fn get_table_schema(&self, table: &TableId) -> Result<Option<TableSchema>> {
        match self
            .client
            .table()
            .get(&table.project_id, &table.dataset_id, &table.table_id)
            .await
        {
            Ok(metadata) => Ok(Some(metadata.schema.unwrap_or_default())),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to get table {}", table)),
        }
    }

    async fn create_table(&self, table: &TableId, schema: TableSchema) -> Result<()> {
        let metadata = BqTable {
            table_reference: TableReference {
                project_id: table.project_id.clone(),
                dataset_id: table.dataset_id.clone(),
                table_id: table.table_id.clone(),
            },
            schema: Some(schema),
            ..Default::default()
        };
        self.client
            .table()
            .create(&metadata)
            .await
            .with_context(|| format!("Failed to create table {}", table))?;
        Ok(())
    }

    async fn delete_table(&self, table: &TableId) -> Result<()> {
        self.client
            .table()
            .delete(&table.project_id, &table.dataset_id, &table.table_id)
            .await
            .with_context(|| format!("Failed to delete table {}", table))
    }
}
