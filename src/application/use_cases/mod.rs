//! # Use Cases
//!
//! アプリケーションのユースケース

pub mod describe_table;
pub mod execute_query;
pub mod insert_rows;
pub mod update_column;
pub mod upload_table;
