//! Maintenance commands for operators, run outside the HTTP server.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing::info;

use crate::{
    auth::{
        handlers::{is_valid_email, normalize_email},
        password::{hash_password, is_long_enough, MIN_PASSWORD_LEN},
    },
    db,
    properties::seed,
    users::{Role, User},
};

/// DreamBid administration tool
#[derive(Parser)]
#[command(name = "dreambid-admin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the schema; objects that already exist are skipped
    InitDb {
        /// Run this SQL file instead of the bundled script
        #[arg(long)]
        script: Option<PathBuf>,
    },

    /// Set a new password for an existing account
    ResetAdminPassword {
        #[arg(long, default_value = "admin@dreambid.com")]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
    },

    /// Attach sample images to every property
    SeedImages,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let db = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&cli.database_url)
        .await
        .context("connect to database")?;

    match cli.command {
        Commands::InitDb { script } => init_db(&db, script).await,
        Commands::ResetAdminPassword { email, password } => {
            reset_password(&db, &email, &password).await
        }
        Commands::CreateAdmin {
            email,
            password,
            full_name,
        } => create_admin(&db, &email, &password, full_name.as_deref()).await,
        Commands::SeedImages => {
            let report = seed::seed_images(&db).await?;
            println!(
                "Seeded {} images across {} properties ({} total)",
                report.inserted, report.properties, report.total_images
            );
            Ok(())
        }
    }
}

async fn init_db(db: &PgPool, script: Option<PathBuf>) -> anyhow::Result<()> {
    let report = match script {
        Some(path) => {
            let sql = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("read {}", path.display()))?;
            db::run_script(db, &sql).await?
        }
        None => db::bootstrap(db).await?,
    };
    println!(
        "Executed {}, already present {}, failed {}",
        report.executed, report.already_existed, report.failed
    );
    Ok(())
}

fn check_password(password: &str) -> anyhow::Result<()> {
    if !is_long_enough(password) {
        bail!("password must be at least {} characters", MIN_PASSWORD_LEN);
    }
    Ok(())
}

async fn reset_password(db: &PgPool, email: &str, password: &str) -> anyhow::Result<()> {
    check_password(password)?;
    let email = normalize_email(email);
    let hash = hash_password(password)?;
    match User::update_password_by_email(db, &email, &hash).await? {
        Some(updated) => {
            info!(email = %updated, "password reset");
            println!("Password updated for {}", updated);
            Ok(())
        }
        None => bail!("no account with email {}", email),
    }
}

async fn create_admin(
    db: &PgPool,
    email: &str,
    password: &str,
    full_name: Option<&str>,
) -> anyhow::Result<()> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        bail!("invalid email {}", email);
    }
    check_password(password)?;
    if User::find_by_email(db, &email).await?.is_some() {
        bail!("an account with email {} already exists", email);
    }

    let hash = hash_password(password)?;
    let user = match User::create(db, &email, &hash, full_name, None, Role::Admin).await {
        Ok(user) => user,
        Err(e) if db::is_unique_violation(&e) => {
            bail!("an account with email {} already exists", email)
        }
        Err(e) => return Err(e),
    };
    info!(user_id = %user.id, "admin created");
    println!("Created admin {} ({})", user.email, user.id);
    Ok(())
}
