//! # Taproom Till Library
//!
//! The till's command layer and its command-line front end.
//!
//! ## Module Organization
//! ```text
//! taproom_till/
//! ├── lib.rs          ◄─── You are here (startup & run)
//! ├── cli.rs          ◄─── Argument parsing and dispatch
//! ├── config.rs       ◄─── till.toml + TAPROOM_* environment
//! ├── error.rs        ◄─── API error type for commands
//! └── commands/
//!     ├── product.rs  ◄─── Catalog
//!     ├── ticket.rs   ◄─── Open tickets
//!     ├── sale.rs     ◄─── Checkout and receipts
//!     └── report.rs   ◄─── Sales reports
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Invocation, USAGE};
use crate::config::TillConfig;
use crate::error::ApiError;
use taproom_db::{Database, DbConfig};

/// Runs one till invocation and returns the process exit status.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Parse arguments        (help → usage, exit 0)                      │
/// │  2. Load TillConfig        (file → env → --db override)                │
/// │  3. Initialize tracing     (RUST_LOG, else config log_filter)          │
/// │  4. Open database          (WAL, migrations applied)                   │
/// │  5. Dispatch command       (JSON or text on stdout)                    │
/// │  6. Close pool                                                          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(args: Vec<String>) -> i32 {
    let invocation = match cli::parse(&args) {
        Ok(invocation) => invocation,
        Err(err) => return report_error(&err),
    };

    if invocation.wants_help() {
        println!("{}", USAGE);
        return 0;
    }

    let mut config = match TillConfig::load(invocation.config_path.clone()) {
        Ok(config) => config,
        Err(err) => return report_error(&ApiError::validation(err.to_string())),
    };
    if let Some(path) = &invocation.db_path {
        config.database_path = path.clone();
    }

    init_tracing(&config.log_filter);

    match dispatch(&config, &invocation).await {
        Ok(output) => {
            println!("{}", output.render());
            0
        }
        Err(err) => report_error(&err),
    }
}

async fn dispatch(config: &TillConfig, invocation: &Invocation) -> Result<cli::Output, ApiError> {
    if invocation.group == "config" {
        return cli::execute_config(config, invocation);
    }

    let db = open_database(&config.database_path).await?;
    let result = cli::execute(&db, config, invocation).await;
    db.close().await;
    result
}

/// Opens the till database, creating its directory on first use.
pub async fn open_database(path: &Path) -> Result<Database, ApiError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ApiError::internal(format!("Cannot create {}: {}", parent.display(), e)))?;
    }

    info!(db_path = %path.display(), "Opening database");
    Ok(Database::new(DbConfig::new(path)).await?)
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so stdout carries only command output.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=taproom_db=trace` - Trace the database layer only
/// - Default: the config's `log_filter`
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn report_error(err: &ApiError) -> i32 {
    match serde_json::to_string(err) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}", err),
    }
    err.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_help_exits_cleanly() {
        assert_eq!(run(vec![]).await, 0);
        assert_eq!(run(vec!["--help".into()]).await, 0);
    }

    #[tokio::test]
    async fn test_bad_arguments_exit_with_validation_status() {
        assert_eq!(run(vec!["report".into(), "summary".into(), "--from".into()]).await, 2);
    }

    #[tokio::test]
    async fn test_file_database_roundtrip() {
        let dir = std::env::temp_dir().join(format!("taproom-till-run-{}", std::process::id()));
        let db_path = dir.join("till.db");
        let db_arg = db_path.to_string_lossy().to_string();

        let argv = |rest: &[&str]| {
            let mut v = vec!["--db".to_string(), db_arg.clone()];
            v.extend(rest.iter().map(|s| s.to_string()));
            v
        };

        assert_eq!(run(argv(&["product", "seed"])).await, 0);
        assert_eq!(run(argv(&["ticket", "new", "Mesa"])).await, 0);

        let db = open_database(&db_path).await.unwrap();
        assert_eq!(db.products().count().await.unwrap(), 7);
        assert_eq!(db.tickets().list_open_tickets().await.unwrap().len(), 1);
        db.close().await;

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
