//! # Insert Rows Use Case
//!
//! 行のストリーミング挿入ユースケース

use std::sync::Arc;

use anyhow::Result;
use log::{error, info};

use crate::domain::entities::table::JsonRow;
use crate::domain::entities::table_id::TableId;
use crate::domain::errors::BigQueryHelperError;
use crate::domain::repositories::warehouse_repository::WarehouseRepository;

/// 行挿入ユースケース
pub struct InsertRowsUseCase<R: WarehouseRepository + ?Sized> {
    warehouse_repository: Arc<R>,
}

impl<R: WarehouseRepository + ?Sized> InsertRowsUseCase<R> {
    /// 新しいユースケースを作成
    pub fn new(warehouse_repository: Arc<R>) -> Self {
        Self {
            warehouse_repository,
        }
    }

    /// 行を挿入する
    ///
    /// # Returns
    ///
    /// 挿入された行数
    ///
    /// # Errors
    ///
    /// BigQuery が行エラーを返した場合は `InsertFailed`、
    /// リクエスト自体が失敗した場合はそのエラーを返す
    pub async fn execute(&self, table_id: &TableId, rows: &[JsonRow]) -> Result<usize> {
        let errors = match self.warehouse_repository.insert_rows(table_id, rows).await {
            Ok(errors) => errors,
            Err(e) => {
                error!("Failed to insert rows: {:#}", e);
                return Err(e);
            }
        };

        if !errors.is_empty() {
            let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
            error!("Encountered errors while inserting rows: {:?}", errors);
            return Err(BigQueryHelperError::InsertFailed {
                table_id: table_id.to_string(),
                errors,
            }
            .into());
        }

        info!("{}: {} new rows have been added.", table_id, rows.len());
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::warehouse_repository::{
        MockWarehouseRepository, RowInsertError,
    };
    use serde_json::json;

    fn rows() -> Vec<JsonRow> {
        vec![
            json!({"col1": "val1"}).as_object().unwrap().clone(),
            json!({"col1": "val2"}).as_object().unwrap().clone(),
        ]
    }

    #[tokio::test]
    async fn test_insert_rows_success() {
        let mut mock = MockWarehouseRepository::new();
        mock.expect_insert_rows()
            .withf(|table, rows| table.to_string() == "project.dataset.table" && rows.len() == 2)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let use_case = InsertRowsUseCase::new(Arc::new(mock));
        let table_id = TableId::new("project", "dataset", "table");

        let inserted = use_case.execute(&table_id, &rows()).await.unwrap();
        assert_eq!(inserted, 2);
    }

    #[tokio::test]
    async fn test_insert_rows_with_row_errors() {
        let mut mock = MockWarehouseRepository::new();
        mock.expect_insert_rows().returning(|_, _| {
            Ok(vec![RowInsertError {
                index: 1,
                messages: vec!["no such field: col1".to_string()],
            }])
        });

        let use_case = InsertRowsUseCase::new(Arc::new(mock));
        let table_id = TableId::new("project", "dataset", "table");

        let err = use_case.execute(&table_id, &rows()).await.unwrap_err();
        let domain_err = err.downcast_ref::<BigQueryHelperError>().unwrap();
        assert_eq!(
            domain_err,
            &BigQueryHelperError::InsertFailed {
                table_id: "project.dataset.table".to_string(),
                errors: vec!["row 1: no such field: col1".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_insert_rows_request_failure() {
        let mut mock = MockWarehouseRepository::new();
        mock.expect_insert_rows()
            .returning(|_, _| Err(anyhow::anyhow!("403 Access Denied")));

        let use_case = InsertRowsUseCase::new(Arc::new(mock));
        let table_id = TableId::new("project", "dataset", "table");

        let result = use_case.execute(&table_id, &rows()).await;
        assert!(result.is_err());
    }
}
