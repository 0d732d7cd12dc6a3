//! # Execute Query Use Case
//!
//! クエリ実行ユースケース（SELECT / DML / 任意の文）

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};

use crate::domain::entities::table::Table;
use crate::domain::repositories::warehouse_repository::{
    QueryParameter, QueryResult, WarehouseRepository,
};

/// クエリ実行ユースケース
pub struct ExecuteQueryUseCase<R: WarehouseRepository + ?Sized> {
    warehouse_repository: Arc<R>,
}

impl<R: WarehouseRepository + ?Sized> ExecuteQueryUseCase<R> {
    /// 新しいユースケースを作成
    pub fn new(warehouse_repository: Arc<R>) -> Self {
        Self {
            warehouse_repository,
        }
    }

    /// クエリを実行して結果を返す
    ///
    /// # Errors
    ///
    /// クエリが失敗した場合、エラーをログに出力したうえでコンテキスト付きで返す
    pub async fn execute(
        &self,
        project_id: &str,
        sql: &str,
        parameters: &[QueryParameter],
    ) -> Result<QueryResult> {
        match self
            .warehouse_repository
            .query(project_id, sql, parameters)
            .await
        {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("Failed to execute query: {:#}", e);
                Err(e).context("Failed to execute query")
            }
        }
    }

    /// クエリを実行して結果をテーブルとして返す
    pub async fn to_table(&self, project_id: &str, sql: &str) -> Result<Table> {
        Ok(self.execute(project_id, sql, &[]).await?.table)
    }

    /// 文を実行し、影響を受けた行数をログに出力する
    ///
    /// # Returns
    ///
    /// DML で影響を受けた行数（DML でなければ `None`）
    pub async fn run(&self, project_id: &str, sql: &str) -> Result<Option<i64>> {
        let result = self.execute(project_id, sql, &[]).await?;
        info!(
            "Query affected {} rows.",
            result.num_dml_affected_rows.unwrap_or(0)
        );
        Ok(result.num_dml_affected_rows)
    }
}
