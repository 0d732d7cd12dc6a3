//! BigQuery Batch Upload Logic
//!
//! バッチアップロードロジック（413 エラー時の自動分割対応）

use anyhow::{Context, Result};
use google_cloud_bigquery::http::tabledata::insert_all::{InsertAllRequest, Row};
use log::{debug, info, warn};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

use super::client::BigQueryService;
use super::errors::{error_chain_to_string, is_request_too_large_error};
use crate::domain::entities::table::JsonRow;
use crate::domain::entities::table_id::TableId;
use crate::domain::errors::BigQueryHelperError;

/// Minimum batch size to avoid infinite splitting
pub const MIN_BATCH_SIZE: usize = 10;

/// Prepare rows for BigQuery insertion, each with a fresh insert id
pub fn prepare_rows(rows: &[JsonRow]) -> Vec<Row<JsonRow>> {
    rows.iter()
        .map(|row| Row {
            insert_id: Some(Uuid::new_v4().to_string()),
            json: row.clone(),
        })
        .collect()
}

/// Upload a batch with automatic splitting on 413 errors
fn upload_batch_with_split<'a, T: BigQueryService + ?Sized>(
    client: &'a T,
    table: &'a TableId,
    chunk: &'a [JsonRow],
    batch_num: usize,
) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>> {
    Box::pin(async move {
        let request = InsertAllRequest {
            rows: prepare_rows(chunk),
            skip_invalid_rows: None,
            ignore_unknown_values: None,
            template_suffix: None,
            trace_id: None,
        };

        match client.insert(table, &request).await {
            Ok(errors) if errors.is_empty() => {
                debug!("Batch {} uploaded successfully", batch_num);
                Ok(chunk.len())
            }
            Ok(errors) => {
                warn!("Batch {} had {} row errors", batch_num, errors.len());
                Err(BigQueryHelperError::InsertFailed {
                    table_id: table.to_string(),
                    errors: errors.iter().map(ToString::to_string).collect(),
                }
                .into())
            }
            Err(e) => {
                let error_msg = error_chain_to_string(&e);

                if !is_request_too_large_error(&error_msg) {
                    return Err(e).context("Failed to upload to BigQuery");
                }

                if chunk.len() <= MIN_BATCH_SIZE {
                    warn!(
                        "Batch {} is too large even at minimum size ({})",
                        batch_num,
                        chunk.len()
                    );
                    return Err(e).context("Batch too large even at minimum size");
                }

                let mid = chunk.len() / 2;
                warn!(
                    "Batch {} too large ({} records), splitting into {} and {}...",
                    batch_num,
                    chunk.len(),
                    mid,
                    chunk.len() - mid
                );

                let first = upload_batch_with_split(client, table, &chunk[..mid], batch_num).await?;
                let second = upload_batch_with_split(client, table, &chunk[mid..], batch_num).await?;
                Ok(first + second)
            }
        }
    })
}

/// Upload rows to BigQuery in batches of `batch_size`
///
/// Returns the number of rows uploaded.
pub async fn upload_to_bigquery<T: BigQueryService + ?Sized>(
    client: &T,
    table: &TableId,
    rows: Vec<JsonRow>,
    batch_size: usize,
) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let batch_size = batch_size.max(1);
    let total_batches = rows.len().div_ceil(batch_size);
    info!(
        "Uploading {} rows to {} in {} batches of up to {} rows",
        rows.len(),
        table,
        total_batches,
        batch_size
    );

    let mut uploaded = 0;
    for (i, chunk) in rows.chunks(batch_size).enumerate() {
        debug!(
            "Uploading batch {}/{} ({} records)...",
            i + 1,
            total_batches,
            chunk.len()
        );

        uploaded += upload_batch_with_split(client, table, chunk, i + 1)
            .await
            .context("Failed to upload batch")?;
    }

    Ok(uploaded)
}

#[cfg(test)]
mod tests {
    use super::super::client::MockBigQueryService;
    use super::*;
    use crate::domain::repositories::warehouse_repository::RowInsertError;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn create_rows(n: usize) -> Vec<JsonRow> {
        (0..n)
            .map(|i| json!({"id": i}).as_object().cloned().unwrap())
            .collect()
    }

    fn table() -> TableId {
        TableId::new("test-project", "test_dataset", "test_table")
    }

    #[test]
    fn test_prepare_rows_unique_insert_ids() {
        let rows = prepare_rows(&create_rows(3));

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].json["id"], json!(1));
        let ids: HashSet<_> = rows.iter().map(|r| r.insert_id.clone().unwrap()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_prepare_rows_empty() {
        assert!(prepare_rows(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_upload_empty_rows() {
        let mut mock = MockBigQueryService::new();
        mock.expect_insert().never();

        let uploaded = upload_to_bigquery(&mock, &table(), vec![], 100).await.unwrap();
        assert_eq!(uploaded, 0);
    }

    #[tokio::test]
    async fn test_upload_multiple_batches() {
        let mut mock = MockBigQueryService::new();
        mock.expect_insert()
            .withf(|table, request| table.table_id == "test_table" && request.rows.len() <= 2)
            .times(2)
            .returning(|_, _| Ok(vec![]));

        let uploaded = upload_to_bigquery(&mock, &table(), create_rows(3), 2)
            .await
            .unwrap();

        assert_eq!(uploaded, 3);
    }

    #[tokio::test]
    async fn test_row_errors_fail_the_upload() {
        let mut mock = MockBigQueryService::new();
        mock.expect_insert().returning(|_, _| {
            Ok(vec![RowInsertError {
                index: 0,
                messages: vec!["no such field: extra".to_string()],
            }])
        });

        let err = upload_to_bigquery(&mock, &table(), create_rows(1), 10)
            .await
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<BigQueryHelperError>(),
            Some(&BigQueryHelperError::InsertFailed {
                table_id: "test-project.test_dataset.test_table".to_string(),
                errors: vec!["row 0: no such field: extra".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn test_split_on_request_too_large() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let mut mock = MockBigQueryService::new();
        mock.expect_insert().returning(move |_, request| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if request.rows.len() > 20 {
                Err(anyhow::anyhow!("413 Request Entity Too Large"))
            } else {
                Ok(vec![])
            }
        });

        let uploaded = upload_to_bigquery(&mock, &table(), create_rows(40), 500)
            .await
            .unwrap();

        assert_eq!(uploaded, 40);
        // 40 -> rejected, 20 + 20 accepted
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_too_large_at_minimum_size() {
        let mut mock = MockBigQueryService::new();
        mock.expect_insert()
            .returning(|_, _| Err(anyhow::anyhow!("413 Request Entity Too Large")));

        let result = upload_to_bigquery(&mock, &table(), create_rows(MIN_BATCH_SIZE), 500).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let mut mock = MockBigQueryService::new();
        mock.expect_insert()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("Authentication failed")));

        let result = upload_to_bigquery(&mock, &table(), create_rows(50), 500).await;

        assert!(result.is_err());
    }
}
