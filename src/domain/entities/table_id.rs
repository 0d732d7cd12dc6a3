//! # Table Identifier
//!
//! `project.dataset.table` 形式のテーブル識別子

use std::fmt;

use crate::domain::errors::BigQueryHelperError;

/// 完全修飾テーブルID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableId {
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }

    /// 文字列からテーブルIDを解析
    ///
    /// `dataset.table` の場合は `default_project` を補う。
    /// バッククォートで囲まれていても受け付ける。
    ///
    /// # Errors
    ///
    /// 区切りの数が合わない場合、または空の要素がある場合にエラーを返す
    pub fn parse(value: &str, default_project: &str) -> Result<Self, BigQueryHelperError> {
        let trimmed = value.trim().trim_matches('`');
        let parts: Vec<&str> = trimmed.split('.').collect();

        let id = match parts.as_slice() {
            [project, dataset, table] => Self::new(*project, *dataset, *table),
            [dataset, table] => Self::new(default_project, *dataset, *table),
            _ => return Err(BigQueryHelperError::InvalidTableId(value.to_string())),
        };

        if id.project_id.is_empty() || id.dataset_id.is_empty() || id.table_id.is_empty() {
            return Err(BigQueryHelperError::InvalidTableId(value.to_string()));
        }

        Ok(id)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}
