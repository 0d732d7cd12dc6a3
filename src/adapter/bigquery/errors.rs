//! BigQuery Error Classification
//!
//! エラー分類

use google_cloud_bigquery::http::error::Error as HttpError;

/// Convert error chain to string including all causes
pub fn error_chain_to_string(e: &anyhow::Error) -> String {
    let mut messages = Vec::new();
    for cause in e.chain() {
        messages.push(cause.to_string());
    }
    messages.join(" | ")
}

/// Check if an error indicates the request was too large (413)
pub fn is_request_too_large_error(error_msg: &str) -> bool {
    error_msg.contains("413") || error_msg.contains("Request Entity Too Large")
}

/// Check if an SDK error is a 404 response
pub fn is_not_found(error: &HttpError) -> bool {
    matches!(error, HttpError::Response(response) if response.code == 404)
}
