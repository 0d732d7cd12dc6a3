//! GCP Authentication
//!
//! Google Cloud Platform認証機能

use std::fmt;

use anyhow::{Context, Result};
use google_cloud_bigquery::client::google_cloud_auth::credentials::CredentialsFile;
use google_cloud_bigquery::client::{Client, ClientConfig};
use serde_json::{Map, Value};

use crate::domain::errors::BigQueryHelperError;

/// Keys a service account info map must carry.
const REQUIRED_INFO_KEYS: [&str; 3] = ["client_email", "private_key", "token_uri"];

/// Where service account credentials come from
#[derive(Clone)]
pub enum CredentialSource {
    /// Path to a service account key file (`~` is expanded)
    FilePath(String),
    /// Parsed contents of a service account key file
    InlineInfo(Map<String, Value>),
    /// Credentials already loaded by the caller
    Resolved(CredentialsFile),
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::FilePath(path) => f.debug_tuple("FilePath").field(path).finish(),
            CredentialSource::InlineInfo(info) => f
                .debug_tuple("InlineInfo")
                .field(&info.get("client_email"))
                .finish(),
            CredentialSource::Resolved(_) => f.write_str("Resolved(..)"),
        }
    }
}

/// Expands tilde in path and returns the full path
pub fn expand_key_path(key_path: &str) -> String {
    shellexpand::tilde(key_path).to_string()
}

/// Checks that inline service account info has the keys needed to sign tokens
pub fn validate_service_account_info(
    info: &Map<String, Value>,
) -> Result<(), BigQueryHelperError> {
    let missing: Vec<&str> = REQUIRED_INFO_KEYS
        .iter()
        .copied()
        .filter(|key| !matches!(info.get(*key), Some(Value::String(s)) if !s.is_empty()))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(BigQueryHelperError::InvalidCredentials(format!(
            "service account info is missing {}",
            missing.join(", ")
        )))
    }
}

/// Loads the credentials described by `source`
pub async fn resolve_credentials(source: CredentialSource) -> Result<CredentialsFile> {
    match source {
        CredentialSource::FilePath(path) => {
            let expanded_path = expand_key_path(&path);
            CredentialsFile::new_from_file(expanded_path.clone())
                .await
                .with_context(|| {
                    format!("Failed to load service account key: {}", expanded_path)
                })
        }
        CredentialSource::InlineInfo(info) => {
            validate_service_account_info(&info)?;
            let json = serde_json::to_string(&info)?;
            CredentialsFile::new_from_str(&json)
                .await
                .context("Failed to parse service account info")
        }
        CredentialSource::Resolved(credentials) => Ok(credentials),
    }
}

/// Creates a BigQuery client with service account authentication
///
/// Returns the client and the project id found in the credentials, if any.
pub async fn create_bigquery_client(source: CredentialSource) -> Result<(Client, Option<String>)> {
    let credentials = resolve_credentials(source).await?;

    let (config, project_id) = ClientConfig::new_with_credentials(credentials)
        .await
        .context("Failed to authenticate with service account")?;

    let client = Client::new(config)
        .await
        .context("Failed to create BigQuery client")?;

    Ok((client, project_id))
}
