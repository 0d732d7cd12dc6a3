//! # Upload Options DTO
//!
//! テーブルアップロード設定のData Transfer Object

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::entities::schema::Schema;

/// アップロード先テーブルが既に存在する場合の動作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    /// 既存テーブルに追記する（存在しなければ作成）
    #[default]
    Append,
    /// 既存テーブルを削除して作り直す
    ///
    /// 行はストリーミング挿入で送るため、作り直した直後のテーブルには
    /// BigQuery 側で挿入が反映されない時間帯がある。アップロードは作成後に
    /// テーブルが見えるまで待つが、メタデータが見えても挿入が取りこぼされる場合がある。
    /// 確実に置き換える必要がある場合は、作り直した後しばらく置いてから追記する。
    Replace,
    /// 既存テーブルがあればエラー
    Fail,
}

impl IfExists {
    pub fn as_str(&self) -> &'static str {
        match self {
            IfExists::Append => "append",
            IfExists::Replace => "replace",
            IfExists::Fail => "fail",
        }
    }
}

impl FromStr for IfExists {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "append" => Ok(IfExists::Append),
            "replace" => Ok(IfExists::Replace),
            "fail" => Ok(IfExists::Fail),
            other => Err(format!(
                "invalid if_exists `{}`: expected append, replace or fail",
                other
            )),
        }
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// アップロード設定
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// 既存テーブルに対する動作
    pub if_exists: IfExists,
    /// テーブルスキーマ（指定時はスキーマ適合を行う）
    pub schema: Option<Schema>,
}

impl UploadOptions {
    /// 新しいアップロード設定を作成します。
    ///
    /// # 例
    ///
    /// ```
    /// use bqhelper::application::dto::upload_options::{IfExists, UploadOptions};
    ///
    /// let options = UploadOptions::new(IfExists::Replace);
    ///
    /// assert_eq!(options.if_exists, IfExists::Replace);
    /// assert!(options.schema.is_none());
    /// ```
    pub fn new(if_exists: IfExists) -> Self {
        Self {
            if_exists,
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// スキーマ適合に使うスキーマ
    ///
    /// 空のスキーマは未指定として扱う
    pub fn conform_schema(&self) -> Option<&Schema> {
        self.schema.as_ref().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::schema::{FieldType, SchemaField};

    #[test]
    fn test_if_exists_from_str() {
        assert_eq!("append".parse::<IfExists>().unwrap(), IfExists::Append);
        assert_eq!("REPLACE".parse::<IfExists>().unwrap(), IfExists::Replace);
        assert_eq!("fail".parse::<IfExists>().unwrap(), IfExists::Fail);
        assert!("overwrite".parse::<IfExists>().is_err());
    }

    #[test]
    fn test_if_exists_default_is_append() {
        assert_eq!(IfExists::default(), IfExists::Append);
        assert_eq!(UploadOptions::default().if_exists, IfExists::Append);
    }

    #[test]
    fn test_if_exists_serde() {
        let value: IfExists = serde_json::from_str("\"replace\"").unwrap();
        assert_eq!(value, IfExists::Replace);
        assert_eq!(serde_json::to_string(&IfExists::Fail).unwrap(), "\"fail\"");
    }

    #[test]
    fn test_conform_schema_ignores_empty() {
        let options = UploadOptions::new(IfExists::Append).with_schema(Schema::default());
        assert!(options.conform_schema().is_none());

        let schema = Schema::new(vec![SchemaField::new("id", FieldType::Integer)]).unwrap();
        let options = UploadOptions::new(IfExists::Append).with_schema(schema);
        assert!(options.conform_schema().is_some());
    }
}
