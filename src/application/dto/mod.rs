//! # Data Transfer Objects

pub mod upload_options;
