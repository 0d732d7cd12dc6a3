//! Configuration
//!
//! JSON設定ファイルの読み込み

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;

use crate::adapter::auth::gcp_auth::CredentialSource;
use crate::application::dto::upload_options::IfExists;

fn default_location() -> String {
    "US".to_string()
}

fn default_upload_batch_size() -> usize {
    500
}

fn default_query_timeout_ms() -> i64 {
    10_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub project_id: String,

    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default = "default_upload_batch_size")]
    pub upload_batch_size: usize,

    #[serde(default)]
    pub default_if_exists: IfExists,

    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: i64,

    // Authentication (exactly one of the two)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_key_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_info: Option<Map<String, Value>>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::from_json_str(&content).with_context(|| format!("Invalid config file: {}", path))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        if config.project_id.is_empty() {
            bail!("project_id must not be empty");
        }
        if config.upload_batch_size == 0 {
            bail!("upload_batch_size must be greater than 0");
        }
        Ok(config)
    }

    /// Returns the configured credential source.
    ///
    /// Exactly one of `service_account_key_path` and `service_account_info` must be set.
    pub fn credential_source(&self) -> Result<CredentialSource> {
        match (&self.service_account_key_path, &self.service_account_info) {
            (Some(path), None) => Ok(CredentialSource::FilePath(path.clone())),
            (None, Some(info)) => Ok(CredentialSource::InlineInfo(info.clone())),
            (Some(_), Some(_)) => bail!(
                "Only one of service_account_key_path and service_account_info may be set"
            ),
            (None, None) => bail!(
                "Either service_account_key_path or service_account_info must be set"
            ),
        }
    }
}
