//! # BigQuery Helper
//!
//! ユースケースをまとめた BigQuery 操作のファサード
//!
//! テーブルIDはデータセット部分のみ（`dataset.table`）でも指定でき、
//! その場合は現在のプロジェクトIDで補完される

use std::sync::Arc;

use anyhow::Result;

use crate::application::dto::upload_options::UploadOptions;
use crate::application::use_cases::describe_table::DescribeTableUseCase;
use crate::application::use_cases::execute_query::ExecuteQueryUseCase;
use crate::application::use_cases::insert_rows::InsertRowsUseCase;
use crate::application::use_cases::update_column::UpdateColumnUseCase;
use crate::application::use_cases::upload_table::{UploadSummary, UploadTableUseCase};
use crate::domain::entities::schema::Schema;
use crate::domain::entities::table::{CellValue, JsonRow, Table};
use crate::domain::entities::table_id::TableId;
use crate::domain::repositories::warehouse_repository::{QueryResult, WarehouseRepository};
use crate::domain::services::dml_builder::MatchValue;

/// BigQuery ヘルパー
pub struct BigQueryHelper<R: WarehouseRepository + ?Sized> {
    project_id: String,
    warehouse_repository: Arc<R>,
}

impl<R: WarehouseRepository + ?Sized> BigQueryHelper<R> {
    /// 新しいヘルパーを作成
    pub fn new(project_id: impl Into<String>, warehouse_repository: Arc<R>) -> Self {
        Self {
            project_id: project_id.into(),
            warehouse_repository,
        }
    }

    /// 現在のプロジェクトID
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// ジョブ実行とテーブルID補完に使うプロジェクトを切り替える
    pub fn set_project_id(&mut self, project_id: impl Into<String>) {
        self.project_id = project_id.into();
    }

    /// テーブルIDを現在のプロジェクトで補完して解析する
    pub fn resolve_table_id(&self, table_id: &str) -> Result<TableId> {
        Ok(TableId::parse(table_id, &self.project_id)?)
    }

    /// クエリを実行し、全結果を返す
    pub async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        ExecuteQueryUseCase::new(Arc::clone(&self.warehouse_repository))
            .execute(&self.project_id, sql, &[])
            .await
    }

    /// クエリを実行し、結果をテーブルとして返す
    pub async fn query_to_table(&self, sql: &str) -> Result<Table> {
        ExecuteQueryUseCase::new(Arc::clone(&self.warehouse_repository))
            .to_table(&self.project_id, sql)
            .await
    }

    /// 文を実行し、影響を受けた行数を返す
    pub async fn run_query(&self, sql: &str) -> Result<Option<i64>> {
        ExecuteQueryUseCase::new(Arc::clone(&self.warehouse_repository))
            .run(&self.project_id, sql)
            .await
    }

    /// 行をストリーミング挿入する
    pub async fn insert_rows(&self, table_id: &str, rows: &[JsonRow]) -> Result<usize> {
        let table_id = self.resolve_table_id(table_id)?;
        InsertRowsUseCase::new(Arc::clone(&self.warehouse_repository))
            .execute(&table_id, rows)
            .await
    }

    /// テーブルをアップロードする（スキーマ指定時は適合させてから）
    pub async fn table_to_bigquery(
        &self,
        table: &Table,
        table_id: &str,
        options: &UploadOptions,
    ) -> Result<UploadSummary> {
        let table_id = self.resolve_table_id(table_id)?;
        UploadTableUseCase::new(Arc::clone(&self.warehouse_repository))
            .execute(table, &table_id, options)
            .await
    }

    /// 一致する行の列を更新し、更新行数を返す
    pub async fn update_column(
        &self,
        table_id: &str,
        column_to_check: &str,
        new_value_column: &str,
        values_to_match: &[MatchValue],
        new_value: CellValue,
    ) -> Result<i64> {
        let table_id = self.resolve_table_id(table_id)?;
        UpdateColumnUseCase::new(Arc::clone(&self.warehouse_repository))
            .execute(
                &self.project_id,
                &table_id,
                column_to_check,
                values_to_match,
                new_value_column,
                new_value,
            )
            .await
    }

    /// テーブルのスキーマを取得する
    pub async fn get_schema(&self, table_id: &str) -> Result<Schema> {
        let table_id = self.resolve_table_id(table_id)?;
        DescribeTableUseCase::new(Arc::clone(&self.warehouse_repository))
            .execute(&table_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::schema::{FieldType, SchemaField};
    use crate::domain::errors::BigQueryHelperError;
    use crate::domain::repositories::warehouse_repository::MockWarehouseRepository;

    #[tokio::test]
    async fn test_unqualified_table_id_uses_current_project() {
        let mut mock = MockWarehouseRepository::new();
        mock.expect_get_schema()
            .withf(|table| table.to_string() == "second.d.t")
            .times(1)
            .returning(|_| Ok(Schema::new(vec![SchemaField::new("id", FieldType::Integer)]).unwrap()));

        let mut helper = BigQueryHelper::new("first", Arc::new(mock));
        helper.set_project_id("second");

        let schema = helper.get_schema("d.t").await.unwrap();

        assert_eq!(helper.project_id(), "second");
        assert_eq!(schema.names(), vec!["id"]);
    }

    #[tokio::test]
    async fn test_qualified_table_id_kept() {
        let mut mock = MockWarehouseRepository::new();
        mock.expect_insert_rows()
            .withf(|table, rows| table.to_string() == "other.d.t" && rows.len() == 1)
            .returning(|_, _| Ok(vec![]));

        let helper = BigQueryHelper::new("p", Arc::new(mock));
        let row = serde_json::json!({"id": 1}).as_object().cloned().unwrap();

        let inserted = helper.insert_rows("other.d.t", &[row]).await.unwrap();
        assert_eq!(inserted, 1);
    }

    #[tokio::test]
    async fn test_invalid_table_id() {
        let helper = BigQueryHelper::new("p", Arc::new(MockWarehouseRepository::new()));

        let err = helper.get_schema("just_a_table").await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BigQueryHelperError>(),
            Some(BigQueryHelperError::InvalidTableId(_))
        ));
    }

    #[tokio::test]
    async fn test_query_runs_in_current_project() {
        let mut mock = MockWarehouseRepository::new();
        mock.expect_query()
            .withf(|project, _, _| project == "p")
            .returning(|_, _, _| {
                Ok(QueryResult {
                    num_dml_affected_rows: Some(3),
                    ..Default::default()
                })
            });

        let helper = BigQueryHelper::new("p", Arc::new(mock));
        assert_eq!(helper.run_query("DELETE FROM d.t WHERE true").await.unwrap(), Some(3));
    }
}
