use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use sqlx::Row;
use sqlx::SqlitePool;

use activitylog::{ActivityLog, AuthManager};

#[derive(Parser, Debug)]
#[command(author, version, about = "activity log maintenance tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the config template and the activity table migration
    Publish {
        #[arg(long, default_value = "config")]
        config_dir: PathBuf,
        #[arg(long, default_value = "migrations")]
        migrations_dir: PathBuf,
    },
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Delete old records, optionally only for the given log names
    Clean {
        log_names: Vec<String>,
        /// Overrides ACTIVITY_CLEAN_DAYS
        #[arg(long)]
        days: Option<i64>,
    },
    /// Record an activity without a causer
    Log {
        description: String,
        #[arg(long = "log")]
        log_name: Option<String>,
        /// key=value, repeatable
        #[arg(long = "property", value_parser = parse_property)]
        properties: Vec<(String, String)>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Publish {
            config_dir,
            migrations_dir,
        } => {
            let (config, migration) = ActivityLog::publish(&config_dir, &migrations_dir)?;
            println!("Published config: {}", config.display());
            match migration {
                Some(path) => println!("Published migration: {}", path.display()),
                None => println!("Migration already published in {}", migrations_dir.display()),
            }
        }
        Commands::MigrateRun => {
            let pool = activitylog::db::init().await?;
            pool.close().await;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            print_status(&pool).await?;
        }
        Commands::Clean { log_names, days } => {
            let activity = ActivityLog::from_env(AuthManager::guest()).await?;
            tracing::info!("cleaning activity log");
            let deleted = activity.clean(days, &log_names).await?;
            println!("Deleted {} record(s) from the activity log", deleted);
        }
        Commands::Log {
            description,
            log_name,
            properties,
        } => {
            let activity = ActivityLog::from_env(AuthManager::guest()).await?;
            let mut logger = activity
                .logger()
                .await?
                .with_properties(properties.into_iter().map(|(k, v)| (k, Value::String(v))));
            if let Some(name) = log_name {
                logger = logger.use_log(name);
            }

            match logger.log(&description).await? {
                Some(record) => println!("Logged {} in `{}`: {}", record.id, record.log_name, record.description),
                None => println!("Activity logging is disabled, nothing recorded"),
            }
        }
    }

    Ok(())
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got `{}`", raw)),
    }
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool) -> anyhow::Result<()> {
    let migrator = sqlx::migrate!();

    // If the migrations table doesn't exist, nothing is applied yet
    let db_applied = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
        .fetch_optional(pool)
        .await?;
    let applied_versions: HashSet<i64> = if db_applied.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let version = migration.version;
        let status = if applied_versions.contains(&version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if !desc.is_empty() { desc } else { "unknown" };
        println!("{:<8} {:<20} {}", status, version, name);
    }

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

