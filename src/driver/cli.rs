//! CLI Argument Parsing
//!
//! CLIの引数解析

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::application::dto::upload_options::IfExists;
use crate::domain::entities::table::CellValue;
use crate::domain::services::dml_builder::MatchValue;

/// BigQuery のクエリ実行・アップロード・スキーマ確認を行うCLI
#[derive(Parser, Debug, Clone)]
#[command(name = "bqhelper")]
#[command(about = "Query, load and inspect BigQuery tables", long_about = None)]
pub struct Args {
    /// Config file path
    #[arg(short, long, default_value = "./bqhelper.json", global = true)]
    pub config: String,

    /// Project to run jobs in (overrides the config file)
    #[arg(long, global = true)]
    pub project: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a query and print the result rows as JSON Lines
    Query {
        /// SQL to run
        sql: String,
    },

    /// Run a statement and report the number of affected rows
    Run {
        /// SQL to run
        sql: String,
    },

    /// Stream rows from a JSON Lines file into a table
    Insert {
        /// Destination table (`project.dataset.table` or `dataset.table`)
        table: String,
        /// JSON Lines file, one object per row
        file: PathBuf,
    },

    /// Upload a JSON Lines file as a table, conforming it to a schema first
    Upload {
        /// Destination table (`project.dataset.table` or `dataset.table`)
        table: String,
        /// JSON Lines file, one object per row
        file: PathBuf,
        /// Schema file (JSON array of {name, type, mode})
        #[arg(long)]
        schema: Option<PathBuf>,
        /// What to do if the table exists: append, replace or fail
        #[arg(long)]
        if_exists: Option<IfExists>,
        /// Dry run mode - don't actually upload
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the schema of a table
    Schema {
        /// Table (`project.dataset.table` or `dataset.table`)
        table: String,
    },

    /// Set a column on rows whose key column matches one of the given values
    Update {
        /// Table (`project.dataset.table` or `dataset.table`)
        table: String,
        /// Column compared against the match values
        #[arg(long)]
        column_to_check: String,
        /// Value to match (repeatable); integers are matched as numbers
        #[arg(long = "match", required = true)]
        values: Vec<String>,
        /// Column to update
        #[arg(long)]
        new_value_column: String,
        /// New value, parsed as JSON when possible (`5`, `true`, `null`), text otherwise
        #[arg(long)]
        new_value: String,
    },
}

/// 照合値を解析する（整数として読めるものは数値）
pub fn parse_match_value(raw: &str) -> MatchValue {
    match raw.parse::<i64>() {
        Ok(i) => MatchValue::Int(i),
        Err(_) => MatchValue::Str(raw.to_string()),
    }
}

/// 新しい値を解析する（JSON として読めなければ文字列）
pub fn parse_new_value(raw: &str) -> CellValue {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => CellValue::from_json(&value),
        Err(_) => CellValue::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_config() {
        let args = Args::parse_from(["bqhelper", "schema", "d.t"]);
        assert_eq!(args.config, "./bqhelper.json");
        assert_eq!(args.project, None);
        assert_eq!(
            args.command,
            Command::Schema {
                table: "d.t".to_string()
            }
        );
    }

    #[test]
    fn test_args_custom_config_and_project() {
        let args = Args::parse_from([
            "bqhelper",
            "-c",
            "/custom/config.json",
            "query",
            "SELECT 1",
            "--project",
            "other",
        ]);
        assert_eq!(args.config, "/custom/config.json");
        assert_eq!(args.project.as_deref(), Some("other"));
        assert_eq!(
            args.command,
            Command::Query {
                sql: "SELECT 1".to_string()
            }
        );
    }

    #[test]
    fn test_args_upload() {
        let args = Args::parse_from([
            "bqhelper",
            "upload",
            "d.t",
            "rows.jsonl",
            "--schema",
            "schema.json",
            "--if-exists",
            "replace",
            "--dry-run",
        ]);
        assert_eq!(
            args.command,
            Command::Upload {
                table: "d.t".to_string(),
                file: PathBuf::from("rows.jsonl"),
                schema: Some(PathBuf::from("schema.json")),
                if_exists: Some(IfExists::Replace),
                dry_run: true,
            }
        );
    }

    #[test]
    fn test_args_upload_rejects_unknown_if_exists() {
        let result =
            Args::try_parse_from(["bqhelper", "upload", "d.t", "rows.jsonl", "--if-exists", "merge"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_args_update() {
        let args = Args::parse_from([
            "bqhelper",
            "update",
            "d.t",
            "--column-to-check",
            "id",
            "--match",
            "1",
            "--match",
            "a",
            "--new-value-column",
            "status",
            "--new-value",
            "done",
        ]);
        match args.command {
            Command::Update { values, new_value, .. } => {
                assert_eq!(values, vec!["1", "a"]);
                assert_eq!(new_value, "done");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_args_update_requires_match() {
        let result = Args::try_parse_from([
            "bqhelper",
            "update",
            "d.t",
            "--column-to-check",
            "id",
            "--new-value-column",
            "status",
            "--new-value",
            "done",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_match_value() {
        assert_eq!(parse_match_value("42"), MatchValue::Int(42));
        assert_eq!(parse_match_value("x-42"), MatchValue::Str("x-42".to_string()));
    }

    #[test]
    fn test_parse_new_value() {
        assert_eq!(parse_new_value("5"), CellValue::Int(5));
        assert_eq!(parse_new_value("true"), CellValue::Bool(true));
        assert_eq!(parse_new_value("null"), CellValue::Null);
        assert_eq!(parse_new_value("\"5\""), CellValue::String("5".to_string()));
        assert_eq!(parse_new_value("done"), CellValue::String("done".to_string()));
    }
}
