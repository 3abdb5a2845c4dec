use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use uuid::Uuid;

use activitylog::db::activities;
use activitylog::registry::{TableActivityModel, BASE_TABLE};
use activitylog::{
    ActivityConfig, ActivityLog, ActivityLogError, AuthManager, DatabaseGuard, Loggable, MemoryGuard, ModelRef,
    ModelRegistry,
};

#[derive(Debug, Clone, Serialize)]
struct User {
    id: i64,
    name: String,
    email: String,
}

impl Loggable for User {
    fn entity_type() -> &'static str {
        "user"
    }

    fn model_key(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
struct Post {
    id: Uuid,
    title: String,
}

impl Loggable for Post {
    fn entity_type() -> &'static str {
        "post"
    }

    fn model_key(&self) -> String {
        self.id.to_string()
    }
}

fn ada() -> User {
    User {
        id: 7,
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    }
}

fn post() -> Post {
    Post {
        id: Uuid::new_v4(),
        title: "Hello world".to_string(),
    }
}

async fn setup_pool(dir: &TempDir) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;
    activitylog::db::migrate(&pool).await?;
    Ok(pool)
}

async fn count(pool: &SqlitePool, table: &str) -> Result<i64> {
    let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(n)
}

async fn setup(auth: AuthManager) -> Result<(TempDir, ActivityLog)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let pool = setup_pool(&dir).await?;
    Ok((dir, ActivityLog::new(pool, ActivityConfig::default(), auth)))
}

#[tokio::test]
async fn plain_description_is_stored_unchanged() -> Result<()> {
    let (_dir, activity) = setup(AuthManager::guest()).await?;

    let record = activity
        .logger()
        .await?
        .log("created a post at 10:30")
        .await?
        .context("logging is enabled")?;

    assert_eq!(record.description, "created a post at 10:30");
    assert_eq!(record.log_name, "default");
    assert!(record.subject.is_none());
    assert!(record.causer.is_none());
    assert!(record.entity.is_none());
    assert!(record.properties.is_empty());

    let stored = activities::find(activity.pool(), BASE_TABLE, record.id)
        .await?
        .context("record was persisted")?;
    assert_eq!(stored.description, "created a post at 10:30");
    assert_eq!(stored.log_name, "default");
    assert!(stored.properties.is_empty());

    Ok(())
}

#[tokio::test]
async fn properties_placeholder_is_resolved() -> Result<()> {
    let (_dir, activity) = setup(AuthManager::guest()).await?;

    let record = activity
        .logger()
        .await?
        .with_properties([("ip", "1.2.3.4")])
        .log("login from :properties.ip")
        .await?
        .context("logging is enabled")?;

    assert_eq!(record.description, "login from 1.2.3.4");

    let stored = activities::find(activity.pool(), BASE_TABLE, record.id).await?.context("stored")?;
    assert_eq!(stored.description, "login from 1.2.3.4");
    assert_eq!(stored.property("ip"), Some(&json!("1.2.3.4")));

    Ok(())
}

#[tokio::test]
async fn missing_causer_leaves_token_literal() -> Result<()> {
    let (_dir, activity) = setup(AuthManager::guest()).await?;

    let record = activity
        .logger()
        .await?
        .log("done by :causer.name")
        .await?
        .context("logging is enabled")?;

    assert_eq!(record.description, "done by :causer.name");
    Ok(())
}

#[tokio::test]
async fn subject_entity_and_causer_are_associated() -> Result<()> {
    let user = ada();
    let post = post();
    let (_dir, activity) = setup(AuthManager::guest()).await?;

    let record = activity
        .logger()
        .await?
        .performed_on(&post)
        .for_entity(&user)
        .caused_by(&user)
        .await?
        .log(":causer.name edited :subject.title")
        .await?
        .context("logging is enabled")?;

    assert_eq!(record.description, "Ada edited Hello world");
    assert!(record.subject_is(&post));
    assert!(record.caused_by(&user));

    let stored = activities::find(activity.pool(), BASE_TABLE, record.id).await?.context("stored")?;
    assert_eq!(stored.subject, Some(ModelRef::new("post", post.id.to_string())));
    assert_eq!(stored.causer, Some(ModelRef::new("user", "7")));
    assert_eq!(stored.entity, Some(ModelRef::new("user", "7")));

    Ok(())
}

#[tokio::test]
async fn disabling_logging_skips_persistence_until_enabled() -> Result<()> {
    let (_dir, activity) = setup(AuthManager::guest()).await?;

    let skipped = activity.logger().await?.disable_logging().log("ignored").await?;
    assert!(skipped.is_none());
    assert_eq!(count(activity.pool(), BASE_TABLE).await?, 0);

    // the gate is shared, so a fresh builder is disabled too
    let skipped = activity.logger().await?.log("also ignored").await?;
    assert!(skipped.is_none());
    assert_eq!(count(activity.pool(), BASE_TABLE).await?, 0);

    activity.logger().await?.enable_logging();

    let record = activity.logger().await?.log("recorded").await?;
    assert!(record.is_some());
    assert_eq!(count(activity.pool(), BASE_TABLE).await?, 1);

    Ok(())
}

#[tokio::test]
async fn disabled_config_starts_with_gate_closed() -> Result<()> {
    let dir = tempdir()?;
    let pool = setup_pool(&dir).await?;
    let activity = ActivityLog::new(pool, ActivityConfig::default().with_enabled(false), AuthManager::guest());

    assert!(activity.status().is_disabled());
    assert!(activity.logger().await?.log("nothing").await?.is_none());
    assert_eq!(count(activity.pool(), BASE_TABLE).await?, 0);

    Ok(())
}

#[tokio::test]
async fn unknown_causer_id_is_an_error() -> Result<()> {
    let (_dir, activity) = setup(AuthManager::guest()).await?;

    let err = activity.logger().await?.caused_by(42).await.err().context("expected an error")?;
    match err {
        ActivityLogError::CouldNotDetermineUser(id) => assert_eq!(id, "42"),
        other => panic!("unexpected error: {other}"),
    }

    assert!(activity.logger().await?.caused_by(&ada()).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn causer_id_is_resolved_through_the_guard() -> Result<()> {
    let auth = AuthManager::new("web").with_guard("web", MemoryGuard::new().with_user(&ada()));
    let (_dir, activity) = setup(auth).await?;

    let record = activity
        .logger()
        .await?
        .by("7")
        .await?
        .log("signed in as :causer.email")
        .await?
        .context("logging is enabled")?;

    assert_eq!(record.description, "signed in as ada@example.com");
    assert_eq!(record.causer.map(|c| c.id), Some("7".to_string()));
    Ok(())
}

#[tokio::test]
async fn default_causer_is_the_current_user() -> Result<()> {
    let auth = AuthManager::new("web").with_guard("web", MemoryGuard::new().acting_as(&ada()));
    let (_dir, activity) = setup(auth).await?;

    let record = activity
        .logger()
        .await?
        .log(":causer.name logged in")
        .await?
        .context("logging is enabled")?;

    assert_eq!(record.description, "Ada logged in");
    Ok(())
}

#[tokio::test]
async fn empty_causer_does_not_clear_the_current_one() -> Result<()> {
    let auth = AuthManager::new("web").with_guard("web", MemoryGuard::new().acting_as(&ada()));
    let (_dir, activity) = setup(auth).await?;

    let record = activity
        .logger()
        .await?
        .caused_by(None::<i64>)
        .await?
        .caused_by("")
        .await?
        .log("kept")
        .await?
        .context("logging is enabled")?;

    assert!(record.caused_by(&ada()));
    Ok(())
}

#[tokio::test]
async fn configured_auth_driver_selects_the_guard() -> Result<()> {
    let dir = tempdir()?;
    let pool = setup_pool(&dir).await?;
    let auth = AuthManager::new("web")
        .with_guard("web", MemoryGuard::new())
        .with_guard("api", MemoryGuard::new().acting_as(&ada()));

    let activity = ActivityLog::new(pool.clone(), ActivityConfig::default().with_auth_driver("api"), auth.clone());
    let record = activity.logger().await?.log("via api").await?.context("enabled")?;
    assert!(record.caused_by(&ada()));

    let missing = ActivityLog::new(pool, ActivityConfig::default().with_auth_driver("admin"), auth);
    let err = missing.logger().await.err().context("expected an error")?;
    assert!(matches!(err, ActivityLogError::AuthGuardNotDefined(name) if name == "admin"));

    Ok(())
}

#[tokio::test]
async fn last_write_wins_for_log_name_and_properties() -> Result<()> {
    let (_dir, activity) = setup(AuthManager::guest()).await?;

    let record = activity
        .logger()
        .await?
        .use_log("x")
        .in_log("y")
        .with_property("a", 1)
        .with_property("a", 2)
        .log("configured")
        .await?
        .context("logging is enabled")?;

    assert_eq!(record.log_name, "y");
    assert_eq!(serde_json::Value::Object(record.properties.clone()), json!({"a": 2}));

    let stored = activities::find(activity.pool(), BASE_TABLE, record.id).await?.context("stored")?;
    assert_eq!(stored.log_name, "y");
    assert_eq!(serde_json::Value::Object(stored.properties), json!({"a": 2}));

    Ok(())
}

#[tokio::test]
async fn with_properties_replaces_the_whole_mapping() -> Result<()> {
    let (_dir, activity) = setup(AuthManager::guest()).await?;

    let record = activity
        .logger()
        .await?
        .with_property("old", true)
        .with([("first", json!(1)), ("second", json!({"nested": true}))])
        .log("replaced")
        .await?
        .context("logging is enabled")?;

    let keys: Vec<&str> = record.properties.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["first", "second"]);
    Ok(())
}

#[tokio::test]
async fn blank_log_name_falls_back_to_default() -> Result<()> {
    let dir = tempdir()?;
    let pool = setup_pool(&dir).await?;
    let activity = ActivityLog::new(pool, ActivityConfig::default().with_log_name("audit"), AuthManager::guest());

    let record = activity.logger().await?.use_log("   ").log("fallback").await?.context("enabled")?;
    assert_eq!(record.log_name, "audit");
    Ok(())
}

#[tokio::test]
async fn blank_configured_default_still_names_the_log() -> Result<()> {
    let dir = tempdir()?;
    let pool = setup_pool(&dir).await?;
    let config = ActivityConfig {
        default_log_name: String::new(),
        ..Default::default()
    };
    let activity = ActivityLog::new(pool.clone(), config, AuthManager::guest());

    let record = activity.logger().await?.log("x").await?.context("enabled")?;
    assert_eq!(record.log_name, "default");

    let record = activity.logger().await?.use_log(" ").log("y").await?.context("enabled")?;
    assert_eq!(record.log_name, "default");

    let stored: Vec<String> = sqlx::query_scalar("SELECT log_name FROM activity_log")
        .fetch_all(&pool)
        .await?;
    assert!(stored.iter().all(|name| name == "default"));
    Ok(())
}

#[tokio::test]
async fn invalid_activity_model_fails_at_log_time() -> Result<()> {
    let dir = tempdir()?;
    let pool = setup_pool(&dir).await?;
    let activity = ActivityLog::new(
        pool,
        ActivityConfig::default().with_activity_model("App\\Models\\Post"),
        AuthManager::guest(),
    );

    let err = activity.logger().await?.log("nope").await.err().context("expected an error")?;
    assert!(matches!(err, ActivityLogError::InvalidConfiguration(name) if name == "App\\Models\\Post"));
    assert_eq!(count(activity.pool(), BASE_TABLE).await?, 0);
    Ok(())
}

#[tokio::test]
async fn registered_model_writes_to_its_own_table() -> Result<()> {
    let dir = tempdir()?;
    let pool = setup_pool(&dir).await?;
    sqlx::query(
        "CREATE TABLE audit_log (id TEXT PRIMARY KEY NOT NULL, log_name TEXT NOT NULL, description TEXT NOT NULL, subject_type TEXT, subject_id TEXT, causer_type TEXT, causer_id TEXT, entity_type TEXT, entity_id TEXT, properties TEXT NOT NULL DEFAULT '{}', created_at TEXT NOT NULL, updated_at TEXT NOT NULL)",
    )
    .execute(&pool)
    .await?;

    let activity = ActivityLog::new(pool, ActivityConfig::default().with_activity_model("audit"), AuthManager::guest())
        .with_registry(ModelRegistry::new().register(TableActivityModel::new("audit", "audit_log")));

    let record = activity.logger().await?.log("custom table").await?.context("enabled")?;

    assert_eq!(count(activity.pool(), "audit_log").await?, 1);
    assert_eq!(count(activity.pool(), BASE_TABLE).await?, 0);
    assert!(activities::find(activity.pool(), "audit_log", record.id).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn database_guard_resolves_causer_rows() -> Result<()> {
    let dir = tempdir()?;
    let pool = setup_pool(&dir).await?;
    sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL, deleted_at TEXT)")
        .execute(&pool)
        .await?;
    sqlx::query("INSERT INTO users (id, name, score) VALUES (1, 'Grace', 9.5)")
        .execute(&pool)
        .await?;

    let auth = AuthManager::new("db").with_guard("db", DatabaseGuard::new(pool.clone(), "users", "user"));
    let activity = ActivityLog::new(pool, ActivityConfig::default(), auth);

    let record = activity
        .logger()
        .await?
        .caused_by(1)
        .await?
        .log(":causer.name (#:causer.id, :causer.score) closed the ticket")
        .await?
        .context("enabled")?;

    assert_eq!(record.description, "Grace (#1, 9.5) closed the ticket");
    assert_eq!(record.causer.as_ref().map(|c| c.morph_type.as_str()), Some("user"));

    let err = activity.logger().await?.caused_by(2).await.err().context("expected an error")?;
    assert!(matches!(err, ActivityLogError::CouldNotDetermineUser(id) if id == "2"));
    Ok(())
}
