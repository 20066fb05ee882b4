//! Idempotent schema bootstrap.
//!
//! The setup script is split into statements and run one at a time. Objects
//! that already exist are skipped; any other failing statement is logged and
//! the run continues.

use sqlx::{Executor, PgPool};
use tracing::{debug, info, warn};

/// Bundled schema script.
pub const SETUP_SCRIPT: &str = include_str!("../sql/setup-database.sql");

/// SQLSTATEs meaning "object already exists".
const ALREADY_EXISTS: &[&str] = &["42P07", "42710"];

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub executed: usize,
    pub already_existed: usize,
    pub failed: usize,
}

/// Statements of a script with `--` comment lines stripped; empty chunks are
/// dropped. Statements must not contain `;` inside bodies or literals.
pub fn split_statements(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|stmt| !stmt.is_empty())
        .collect()
}

fn has_code(err: &sqlx::Error, codes: &[&str]) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| codes.contains(&&*code))
            .unwrap_or(false),
        _ => false,
    }
}

fn is_already_exists(err: &sqlx::Error) -> bool {
    has_code(err, ALREADY_EXISTS)
}

/// Whether a query failed on a unique constraint.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .map(|e| has_code(e, &[UNIQUE_VIOLATION]))
        .unwrap_or(false)
}

pub async fn run_script(db: &PgPool, script: &str) -> anyhow::Result<BootstrapReport> {
    let mut report = BootstrapReport::default();
    for statement in split_statements(script) {
        let preview: String = statement.chars().take(50).collect();
        debug!(statement = %preview, "executing");
        match db.execute(statement.as_str()).await {
            Ok(_) => report.executed += 1,
            Err(e) if is_already_exists(&e) => report.already_existed += 1,
            Err(sqlx::Error::Database(e)) => {
                warn!(error = %e, statement = %preview, "bootstrap statement failed");
                report.failed += 1;
            }
            // Connection-level errors abort the run
            Err(e) => return Err(e.into()),
        }
    }
    info!(
        executed = report.executed,
        already_existed = report.already_existed,
        failed = report.failed,
        "database bootstrap finished"
    );
    Ok(report)
}

pub async fn bootstrap(db: &PgPool) -> anyhow::Result<BootstrapReport> {
    run_script(db, SETUP_SCRIPT).await
}
