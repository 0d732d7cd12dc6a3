//! # Domain Errors
//!
//! 呼び出し側の誤り（不正なスキーマ、認証情報など）を表すエラー型

use thiserror::Error;

/// BigQueryヘルパーのドメインエラー
///
/// サービス側の失敗は `anyhow` のコンテキスト付きでそのまま伝播させる。
/// ここでは呼び出し側が修正すべき入力の誤りと、挿入エラーのみを扱う。
#[derive(Debug, Error, PartialEq)]
pub enum BigQueryHelperError {
    /// スキーマ定義が不正
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// テーブルの列構成が不正
    #[error("invalid table: {0}")]
    InvalidTable(String),

    /// テーブルIDの形式が不正
    #[error("invalid table id `{0}`: expected `project.dataset.table` or `dataset.table`")]
    InvalidTableId(String),

    /// 認証情報の形式が不正
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// ストリーミング挿入で行エラーが返された
    #[error("failed to insert rows into {table_id}: {errors:?}")]
    InsertFailed {
        table_id: String,
        errors: Vec<String>,
    },

    /// `if_exists = fail` で既存テーブルにアップロードしようとした
    #[error("table {0} already exists")]
    TableAlreadyExists(String),

    /// UPDATE文の照合値が空
    #[error("values_to_match must not be empty")]
    EmptyMatchValues,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_failed_message() {
        let err = BigQueryHelperError::InsertFailed {
            table_id: "p.d.t".to_string(),
            errors: vec!["row 0: invalid".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("p.d.t"));
        assert!(msg.contains("row 0: invalid"));
    }

    #[test]
    fn test_invalid_table_id_message() {
        let err = BigQueryHelperError::InvalidTableId("a.b.c.d".to_string());
        assert!(err.to_string().contains("a.b.c.d"));
    }
}
