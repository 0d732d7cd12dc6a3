//! # DML Builder
//!
//! 単純な UPDATE 文の組み立て

use std::fmt;

use crate::domain::entities::table_id::TableId;
use crate::domain::errors::BigQueryHelperError;

/// UPDATE 文で新しい値を受け取る名前付きパラメータ
pub const NEW_VALUE_PARAMETER: &str = "new_value";

/// WHERE ... IN (...) の照合値
#[derive(Debug, Clone, PartialEq)]
pub enum MatchValue {
    Str(String),
    Int(i64),
}

impl MatchValue {
    /// SQL リテラルとして出力する
    ///
    /// 文字列はシングルクォートで囲み、`\` と `'` をエスケープする
    pub fn to_sql_literal(&self) -> String {
        match self {
            MatchValue::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            MatchValue::Int(i) => i.to_string(),
        }
    }
}

impl From<&str> for MatchValue {
    fn from(value: &str) -> Self {
        MatchValue::Str(value.to_string())
    }
}

impl From<String> for MatchValue {
    fn from(value: String) -> Self {
        MatchValue::Str(value)
    }
}

impl From<i64> for MatchValue {
    fn from(value: i64) -> Self {
        MatchValue::Int(value)
    }
}

impl fmt::Display for MatchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_literal())
    }
}

pub struct DmlBuilder;

impl DmlBuilder {
    /// `column_to_check` が `values_to_match` のいずれかに一致する行の
    /// `new_value_column` を `@new_value` に更新する UPDATE 文を作る
    ///
    /// # Errors
    ///
    /// `values_to_match` が空の場合（`IN ()` は不正な SQL）
    pub fn build_update_statement(
        table_id: &TableId,
        column_to_check: &str,
        new_value_column: &str,
        values_to_match: &[MatchValue],
    ) -> Result<String, BigQueryHelperError> {
        if values_to_match.is_empty() {
            return Err(BigQueryHelperError::EmptyMatchValues);
        }

        let values_str = values_to_match
            .iter()
            .map(MatchValue::to_sql_literal)
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            "UPDATE `{}`\nSET `{}` = @{}\nWHERE `{}` IN ({})",
            table_id, new_value_column, NEW_VALUE_PARAMETER, column_to_check, values_str
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_update_statement() {
        let table_id = TableId::new("p", "d", "t");
        let sql = DmlBuilder::build_update_statement(
            &table_id,
            "id",
            "status",
            &[MatchValue::from("a"), MatchValue::Int(2), MatchValue::from("c")],
        )
        .unwrap();

        assert_eq!(
            sql,
            "UPDATE `p.d.t`\nSET `status` = @new_value\nWHERE `id` IN ('a', 2, 'c')"
        );
    }

    #[test]
    fn test_string_literal_escaping() {
        assert_eq!(MatchValue::from("O'Brien").to_sql_literal(), r"'O\'Brien'");
        assert_eq!(MatchValue::from(r"a\b").to_sql_literal(), r"'a\\b'");
    }

    #[test]
    fn test_empty_values_rejected() {
        let table_id = TableId::new("p", "d", "t");
        let result = DmlBuilder::build_update_statement(&table_id, "id", "status", &[]);
        assert_eq!(result, Err(BigQueryHelperError::EmptyMatchValues));
    }
}
