//! # Describe Table Use Case
//!
//! テーブルスキーマ取得ユースケース

use std::sync::Arc;

use anyhow::{Context, Result};
use log::error;

use crate::domain::entities::schema::Schema;
use crate::domain::entities::table_id::TableId;
use crate::domain::repositories::warehouse_repository::WarehouseRepository;

pub struct DescribeTableUseCase<R: WarehouseRepository + ?Sized> {
    warehouse_repository: Arc<R>,
}

impl<R: WarehouseRepository + ?Sized> DescribeTableUseCase<R> {
    pub fn new(warehouse_repository: Arc<R>) -> Self {
        Self {
            warehouse_repository,
        }
    }

    /// テーブルのスキーマ（name / type / mode）を取得する
    pub async fn execute(&self, table_id: &TableId) -> Result<Schema> {
        match self.warehouse_repository.get_schema(table_id).await {
            Ok(schema) => Ok(schema),
            Err(e) => {
                error!("Failed to get schema for {}: {:#}", table_id, e);
                Err(e).with_context(|| format!("Failed to get schema for {}", table_id))
            }
        }
    }
}
