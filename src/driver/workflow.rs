//! Workflow Orchestration
//!
//! ワークフローのオーケストレーション

use anyhow::{Context, Result};
use log::info;
use std::path::Path;
use std::sync::Arc;

use crate::adapter::config::Config;
use crate::adapter::connect::connect_from_config;
use crate::adapter::repositories::jsonl_table_repository::JsonlTableRepository;
use crate::application::bigquery_helper::BigQueryHelper;
use crate::application::dto::upload_options::{IfExists, UploadOptions};
use crate::application::use_cases::upload_table::{PreparedUpload, UploadTableUseCase};
use crate::domain::entities::table::Table;
use crate::domain::repositories::table_file_repository::TableFileRepository;
use crate::domain::repositories::warehouse_repository::WarehouseRepository;

use super::cli::{parse_match_value, parse_new_value, Args, Command};

/// Render table rows as JSON Lines
pub fn render_rows(table: &Table) -> String {
    table
        .to_json_rows()
        .into_iter()
        .map(|row| serde_json::Value::Object(row).to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Command Workflow
pub struct CommandWorkflow {
    config: Config,
    table_files: Arc<dyn TableFileRepository>,
}

impl CommandWorkflow {
    /// Create a new workflow instance with dependency injection
    pub fn new(config: Config) -> Self {
        Self::with_table_files(config, Arc::new(JsonlTableRepository::new()))
    }

    pub fn with_table_files(config: Config, table_files: Arc<dyn TableFileRepository>) -> Self {
        Self {
            config,
            table_files,
        }
    }

    /// Build upload options from the command line, falling back to the config
    pub async fn upload_options(
        &self,
        schema_path: Option<&Path>,
        if_exists: Option<IfExists>,
    ) -> Result<UploadOptions> {
        let mut options = UploadOptions::new(if_exists.unwrap_or(self.config.default_if_exists));
        if let Some(path) = schema_path {
            options = options.with_schema(self.table_files.read_schema(path).await?);
        }
        Ok(options)
    }

    /// Read a table file and conform it the way an upload would, without a client
    pub async fn plan_upload(&self, file: &Path, options: &UploadOptions) -> Result<PreparedUpload> {
        let table = self.table_files.read_table(file).await?;
        Ok(UploadTableUseCase::<dyn WarehouseRepository>::prepare(
            &table, options,
        ))
    }

    /// Execute the command
    pub async fn execute(&self, args: Args) -> Result<()> {
        info!("Starting bqhelper...");

        if let Command::Upload {
            table,
            file,
            schema,
            if_exists,
            dry_run: true,
        } = &args.command
        {
            let options = self.upload_options(schema.as_deref(), *if_exists).await?;
            let prepared = self.plan_upload(file, &options).await?;

            println!("✓ Dry-run mode (not actually uploading)");
            println!(
                "  Would upload {} rows to {} (if_exists: {})",
                prepared.table.num_rows(),
                table,
                options.if_exists
            );
            println!("  Schema: {}", prepared.schema.to_json());
            if !prepared.table.is_empty() {
                println!("{}", render_rows(&prepared.table));
            }
            return Ok(());
        }

        let helper = connect_from_config(&self.config, args.project.as_deref())
            .await
            .context("Failed to connect to BigQuery")?;
        println!("✓ Connected to BigQuery (project: {})", helper.project_id());

        self.dispatch(&helper, args.command).await
    }

    /// Run a command against a connected helper
    pub async fn dispatch<R: WarehouseRepository + ?Sized>(
        &self,
        helper: &BigQueryHelper<R>,
        command: Command,
    ) -> Result<()> {
        match command {
            Command::Query { sql } => {
                let table = helper.query_to_table(&sql).await?;
                if !table.is_empty() {
                    println!("{}", render_rows(&table));
                }
                println!("✓ {} rows returned", table.num_rows());
            }
            Command::Run { sql } => {
                let affected = helper.run_query(&sql).await?;
                println!("✓ Query affected {} rows", affected.unwrap_or(0));
            }
            Command::Insert { table, file } => {
                let rows = self.table_files.read_rows(&file).await?;
                if rows.is_empty() {
                    println!("No rows to insert. Exiting.");
                    return Ok(());
                }
                let inserted = helper.insert_rows(&table, &rows).await?;
                println!("✓ Inserted {} rows into {}", inserted, table);
            }
            Command::Upload {
                table,
                file,
                schema,
                if_exists,
                ..
            } => {
                let options = self.upload_options(schema.as_deref(), if_exists).await?;
                let data = self.table_files.read_table(&file).await?;
                let summary = helper.table_to_bigquery(&data, &table, &options).await?;
                if summary.created_table {
                    println!("✓ Created table {}", table);
                }
                println!("✓ Uploaded {} rows to {}", summary.uploaded_rows, table);
            }
            Command::Schema { table } => {
                let schema = helper.get_schema(&table).await?;
                println!("{}", serde_json::to_string_pretty(&schema.to_json())?);
            }
            Command::Update {
                table,
                column_to_check,
                values,
                new_value_column,
                new_value,
            } => {
                let values: Vec<_> = values.iter().map(|v| parse_match_value(v)).collect();
                let updated = helper
                    .update_column(
                        &table,
                        &column_to_check,
                        &new_value_column,
                        &values,
                        parse_new_value(&new_value),
                    )
                    .await?;
                println!("✓ Updated {} rows in {}", updated, table);
            }
        }
        Ok(())
    }
}
