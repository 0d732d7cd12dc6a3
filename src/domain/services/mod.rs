//! # Domain Services
//!
//! エンティティに属さないビジネスロジック
//!
//! - **SchemaConformer**: テーブルをスキーマに適合させる
//! - **SchemaInference**: テーブルからスキーマを推定する
//! - **DmlBuilder**: UPDATE 文の組み立て

pub mod dml_builder;
pub mod schema_conformer;
pub mod schema_inference;
