//! bqhelper - BigQuery helper CLI
//!
//! BigQuery のクエリ実行・アップロード・スキーマ確認

// coverage_nightly cfg が設定されている場合のみ coverage_attribute を有効化
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use anyhow::Result;
use clap::Parser;

use bqhelper::adapter::config::Config;
use bqhelper::driver::{Args, CommandWorkflow};

#[cfg_attr(coverage_nightly, coverage(off))]
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Create workflow with injected dependencies
    let workflow = CommandWorkflow::new(config);

    workflow.execute(args).await
}
