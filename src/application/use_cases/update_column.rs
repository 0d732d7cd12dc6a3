//! # Update Column Use Case
//!
//! 条件に一致する行の列を新しい値で更新するユースケース

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info};

use crate::application::use_cases::execute_query::ExecuteQueryUseCase;
use crate::domain::entities::table::CellValue;
use crate::domain::entities::table_id::TableId;
use crate::domain::repositories::warehouse_repository::{QueryParameter, WarehouseRepository};
use crate::domain::services::dml_builder::{DmlBuilder, MatchValue, NEW_VALUE_PARAMETER};

/// 列更新ユースケース
pub struct UpdateColumnUseCase<R: WarehouseRepository + ?Sized> {
    warehouse_repository: Arc<R>,
    execute_query: ExecuteQueryUseCase<R>,
}

impl<R: WarehouseRepository + ?Sized> UpdateColumnUseCase<R> {
    /// 新しいユースケースを作成
    pub fn new(warehouse_repository: Arc<R>) -> Self {
        Self {
            execute_query: ExecuteQueryUseCase::new(Arc::clone(&warehouse_repository)),
            warehouse_repository,
        }
    }

    /// `column_to_check` が `values_to_match` のいずれかに一致する行の
    /// `new_value_column` を `new_value` に更新する
    ///
    /// 新しい値は `@new_value` パラメータとしてバインドされる。
    /// `Null` の場合は宛先テーブルのスキーマから `new_value_column` の型を調べ、
    /// その型の NULL としてバインドする
    ///
    /// # Returns
    ///
    /// 更新された行数
    ///
    /// # Errors
    ///
    /// `values_to_match` が空の場合、またはクエリが失敗した場合
    pub async fn execute(
        &self,
        project_id: &str,
        table_id: &TableId,
        column_to_check: &str,
        values_to_match: &[MatchValue],
        new_value_column: &str,
        new_value: CellValue,
    ) -> Result<i64> {
        let sql = DmlBuilder::build_update_statement(
            table_id,
            column_to_check,
            new_value_column,
            values_to_match,
        )?;
        let parameters = [self
            .new_value_parameter(table_id, new_value_column, new_value)
            .await?];

        let result = self
            .execute_query
            .execute(project_id, &sql, &parameters)
            .await?;
        let updated = result.num_dml_affected_rows.unwrap_or(0);

        info!("Updated {} rows in {}", updated, table_id);

        Ok(updated)
    }

    async fn new_value_parameter(
        &self,
        table_id: &TableId,
        new_value_column: &str,
        new_value: CellValue,
    ) -> Result<QueryParameter> {
        if !matches!(new_value, CellValue::Null) {
            return Ok(QueryParameter::new(NEW_VALUE_PARAMETER, new_value));
        }

        let schema = self.warehouse_repository.get_schema(table_id).await?;
        match schema.field(new_value_column) {
            Some(field) => Ok(QueryParameter::typed_null(
                NEW_VALUE_PARAMETER,
                field.field_type.clone(),
            )),
            None => {
                debug!(
                    "Column {} not found in {}, binding NULL as STRING",
                    new_value_column, table_id
                );
                Ok(QueryParameter::new(NEW_VALUE_PARAMETER, CellValue::Null))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::schema::{FieldType, Schema, SchemaField};
    use crate::domain::errors::BigQueryHelperError;
    use crate::domain::repositories::warehouse_repository::{
        MockWarehouseRepository, QueryResult,
    };

    #[tokio::test]
    async fn test_update_binds_new_value() {
        let mut mock = MockWarehouseRepository::new();
        mock.expect_query()
            .withf(|project, sql, params| {
                project == "p"
                    && sql == "UPDATE `p.d.t`\nSET `status` = @new_value\nWHERE `id` IN (1, 2)"
                    && params
                        == [QueryParameter::new(
                            "new_value",
                            CellValue::String("done".to_string()),
                        )]
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(QueryResult {
                    num_dml_affected_rows: Some(2),
                    ..Default::default()
                })
            });

        let use_case = UpdateColumnUseCase::new(Arc::new(mock));
        let updated = use_case
            .execute(
                "p",
                &TableId::new("p", "d", "t"),
                "id",
                &[MatchValue::Int(1), MatchValue::Int(2)],
                "status",
                CellValue::String("done".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(updated, 2);
    }

    #[tokio::test]
    async fn test_null_binds_target_column_type() {
        let mut mock = MockWarehouseRepository::new();
        mock.expect_get_schema()
            .withf(|table_id| table_id.to_string() == "p.d.t")
            .times(1)
            .returning(|_| {
                Ok(Schema::new(vec![
                    SchemaField::new("id", FieldType::String),
                    SchemaField::new("score", FieldType::Integer),
                ])
                .unwrap())
            });
        mock.expect_query()
            .withf(|_, _, params| {
                params == [QueryParameter::typed_null("new_value", FieldType::Integer)]
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(QueryResult {
                    num_dml_affected_rows: Some(1),
                    ..Default::default()
                })
            });

        let use_case = UpdateColumnUseCase::new(Arc::new(mock));
        let updated = use_case
            .execute(
                "p",
                &TableId::new("p", "d", "t"),
                "id",
                &[MatchValue::from("a")],
                "score",
                CellValue::Null,
            )
            .await
            .unwrap();

        assert_eq!(updated, 1);
    }

    #[tokio::test]
    async fn test_null_for_unknown_column_stays_untyped() {
        let mut mock = MockWarehouseRepository::new();
        mock.expect_get_schema().returning(|_| {
            Ok(Schema::new(vec![SchemaField::new("id", FieldType::String)]).unwrap())
        });
        mock.expect_query()
            .withf(|_, _, params| params[0].null_type.is_none() && params[0].value == CellValue::Null)
            .times(1)
            .returning(|_, _, _| Ok(QueryResult::default()));

        let use_case = UpdateColumnUseCase::new(Arc::new(mock));
        let updated = use_case
            .execute(
                "p",
                &TableId::new("p", "d", "t"),
                "id",
                &[MatchValue::from("a")],
                "missing",
                CellValue::Null,
            )
            .await
            .unwrap();

        assert_eq!(updated, 0);
    }

    #[tokio::test]
    async fn test_empty_match_values_skips_query() {
        let mut mock = MockWarehouseRepository::new();
        mock.expect_query().never();

        let use_case = UpdateColumnUseCase::new(Arc::new(mock));
        let err = use_case
            .execute(
                "p",
                &TableId::new("p", "d", "t"),
                "id",
                &[],
                "status",
                CellValue::Null,
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<BigQueryHelperError>(),
            Some(&BigQueryHelperError::EmptyMatchValues)
        );
    }

    #[tokio::test]
    async fn test_query_failure_propagates() {
        let mut mock = MockWarehouseRepository::new();
        mock.expect_query()
            .returning(|_, _, _| Err(anyhow::anyhow!("permission denied")));

        let use_case = UpdateColumnUseCase::new(Arc::new(mock));
        let result = use_case
            .execute(
                "p",
                &TableId::new("p", "d", "t"),
                "id",
                &[MatchValue::from("a")],
                "status",
                CellValue::Bool(true),
            )
            .await;

        assert!(result.is_err());
    }
}
