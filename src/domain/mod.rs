//! # Domain Layer
//!
//! このモジュールはビジネスの核心的なルールとエンティティを定義します。
//!
//! ## 特徴
//!
//! - 外部サービスに依存しない
//! - BigQuery SDK の型を知らない
//! - 純粋なビジネスロジック（スキーマ適合、スキーマ推定、DML 組み立て）
//!
//! ## 構成要素
//!
//! - **entities**: ビジネスエンティティ（Table, Schema, TableIdなど）
//! - **repositories**: Repository trait（インターフェース定義のみ）
//! - **services**: Domain Service（ビジネスルール）
//! - **errors**: 呼び出し側の誤りを表すエラー型

pub mod entities;
pub mod errors;
pub mod repositories;
pub mod services;
