//! Migration runner CLI
//!
//! Applies versioned DDL to the public schema and to every tenant schema,
//! each tracked independently. Exit code 0 on success, 1 on failure.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use pulzifi_api::config::Settings;
use pulzifi_api::db::init_pool;
use pulzifi_api::migrate::{MigrateCommand, MigrateScope, Runner};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Cmd {
    Up,
    Down,
    Force,
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scope {
    All,
    Public,
    Tenant,
}

#[derive(Parser, Debug)]
#[command(name = "migrate", about = "Pulzifi schema migration runner")]
struct Args {
    /// Database URL (falls back to DATABASE_URL)
    #[arg(long)]
    db: Option<String>,

    /// Command to run
    #[arg(long, value_enum)]
    cmd: Cmd,

    /// Number of steps for up/down (up defaults to all, down to one)
    #[arg(long)]
    steps: Option<usize>,

    /// Target version for force
    #[arg(long)]
    to: Option<i64>,

    /// Which schemas to migrate
    #[arg(long, value_enum, default_value = "all")]
    scope: Scope,

    /// Single tenant schema (implies --scope tenant)
    #[arg(long)]
    tenant: Option<String>,

    /// Migrations directory containing public/ and tenant/
    #[arg(long, default_value = "./migrations")]
    source: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let database_url = match args.db {
        Some(url) => url,
        None => std::env::var("DATABASE_URL")
            .context("no --db flag and DATABASE_URL is not set")?,
    };
    let db_config =
        Settings::parse_database_url(&database_url).context("invalid database URL")?;

    let command = match args.cmd {
        Cmd::Up => MigrateCommand::Up { steps: args.steps },
        Cmd::Down => MigrateCommand::Down { steps: args.steps },
        Cmd::Force => MigrateCommand::Force {
            version: args.to.context("--cmd force requires --to <version>")?,
        },
        Cmd::Version => MigrateCommand::Version,
    };

    let scope = match (args.scope, args.tenant) {
        (Scope::Public, None) => MigrateScope::Public,
        (Scope::Tenant, tenant) => MigrateScope::Tenant(tenant),
        (Scope::All, None) => MigrateScope::All,
        (_, Some(_)) => bail!("--tenant requires --scope tenant"),
    };

    let pool = init_pool(&db_config).await?;
    let runner = Runner::new(pool, &args.source)?;

    let reports = runner.run(command, &scope).await?;
    for report in reports {
        println!(
            "{}: version={} dirty={}",
            report.schema, report.version, report.dirty
        );
    }

    Ok(())
}
