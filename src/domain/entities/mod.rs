//! # Domain Entities
//!
//! ビジネスエンティティとバリューオブジェクトを定義するモジュール
//!
//! ## エンティティ
//!
//! - **Table**: 列指向の表形式データ
//! - **Schema**: テーブルスキーマ
//! - **TableId**: 完全修飾テーブルID

pub mod schema;
pub mod table;
pub mod table_id;
