//! Client Wiring
//!
//! 認証情報から BigQueryHelper を組み立てる

use anyhow::Result;
use log::info;
use std::sync::Arc;

use crate::adapter::auth::{create_bigquery_client, CredentialSource};
use crate::adapter::bigquery::client::OwnedBigQueryClient;
use crate::adapter::config::Config;
use crate::adapter::repositories::bigquery_warehouse_repository::{
    BigQueryWarehouseRepository, WarehouseSettings,
};
use crate::application::bigquery_helper::BigQueryHelper;

/// BigQuery に接続したヘルパー
pub type ConnectedHelper = BigQueryHelper<BigQueryWarehouseRepository>;

impl BigQueryHelper<BigQueryWarehouseRepository> {
    /// 認証情報からクライアントを作成し、ヘルパーを返す
    ///
    /// # Errors
    ///
    /// 認証情報が読めない場合、またはクライアントの作成に失敗した場合
    pub async fn connect(project_id: impl Into<String>, source: CredentialSource) -> Result<Self> {
        Self::connect_with_settings(project_id, source, WarehouseSettings::default()).await
    }

    /// 設定を指定して接続する
    pub async fn connect_with_settings(
        project_id: impl Into<String>,
        source: CredentialSource,
        settings: WarehouseSettings,
    ) -> Result<Self> {
        let project_id = project_id.into();
        let (client, credentials_project) = create_bigquery_client(source).await?;

        if let Some(credentials_project) = credentials_project {
            if credentials_project != project_id {
                info!(
                    "Credentials belong to project {}, running jobs in {}",
                    credentials_project, project_id
                );
            }
        }

        let repository = BigQueryWarehouseRepository::new(
            Arc::new(OwnedBigQueryClient::new(client)),
            settings,
        );
        Ok(BigQueryHelper::new(project_id, Arc::new(repository)))
    }
}

/// 設定ファイルの内容で接続する
///
/// `project_override` が指定された場合は設定の `project_id` より優先する
pub async fn connect_from_config(
    config: &Config,
    project_override: Option<&str>,
) -> Result<ConnectedHelper> {
    let project_id = project_override.unwrap_or(&config.project_id);
    ConnectedHelper::connect_with_settings(
        project_id,
        config.credential_source()?,
        WarehouseSettings::from(config),
    )
    .await
}
