use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::AuthManager;
use crate::clean;
use crate::config::ActivityConfig;
use crate::errors::ActivityResult;
use crate::logger::ActivityLogger;
use crate::publish;
use crate::registry::{ActivityModel, ModelRegistry};
use crate::status::ActivityLogStatus;

/// Shared handle to everything the activity logger needs. Cloning is cheap
/// and every clone shares the same logging gate.
#[derive(Clone)]
pub struct ActivityLog {
    pool: SqlitePool,
    config: Arc<ActivityConfig>,
    status: ActivityLogStatus,
    registry: Arc<ModelRegistry>,
    auth: Arc<AuthManager>,
}

impl ActivityLog {
    pub fn new(pool: SqlitePool, config: ActivityConfig, auth: AuthManager) -> Self {
        let status = ActivityLogStatus::new(config.enabled);
        Self {
            pool,
            config: Arc::new(config),
            status,
            registry: Arc::new(ModelRegistry::new()),
            auth: Arc::new(auth),
        }
    }

    /// Reads `ActivityConfig` from the environment, connects to `DATABASE_URL`
    /// and runs the bundled migrations.
    pub async fn from_env(auth: AuthManager) -> anyhow::Result<Self> {
        let config = ActivityConfig::from_env()?;
        let pool = crate::db::init().await?;
        Ok(Self::new(pool, config, auth))
    }

    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &ActivityConfig {
        &self.config
    }

    pub fn status(&self) -> &ActivityLogStatus {
        &self.status
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    /// The activity model selected by `ACTIVITY_MODEL`. Checked on every call.
    pub fn determine_activity_model(&self) -> ActivityResult<Arc<dyn ActivityModel>> {
        self.registry
            .determine_activity_model(self.config.activity_model.as_deref())
    }

    /// A builder whose default causer is the configured guard's current user.
    pub async fn logger(&self) -> ActivityResult<ActivityLogger> {
        let guard = self.auth.guard(self.config.default_auth_driver.as_deref())?;
        let causer = guard.user().await?;
        Ok(ActivityLogger::new(self.clone(), guard, causer))
    }

    /// A builder whose default causer is the actor with `actor_id`, e.g. the
    /// subject of a verified bearer token. Unknown ids leave the causer unset.
    pub async fn logger_for(&self, actor_id: Option<&str>) -> ActivityResult<ActivityLogger> {
        let guard = self.auth.guard(self.config.default_auth_driver.as_deref())?;
        let causer = match actor_id {
            Some(id) => guard.retrieve_by_id(id).await?,
            None => None,
        };
        Ok(ActivityLogger::new(self.clone(), guard, causer))
    }

    /// Deletes records older than the configured retention window.
    /// `log_names` overrides `ACTIVITY_CLEAN_LOG_NAMES` when non-empty.
    pub async fn clean(&self, days: Option<i64>, log_names: &[String]) -> ActivityResult<u64> {
        let model = self.determine_activity_model()?;
        let days = days.unwrap_or(self.config.delete_records_older_than_days);
        let log_names = if log_names.is_empty() {
            self.config.clean_log_names.as_slice()
        } else {
            log_names
        };

        clean::clean_records(&self.pool, model.table(), days, log_names).await
    }

    /// Writes the config template and, unless one already exists, the
    /// migration for the activity table.
    pub fn publish(config_dir: &Path, migrations_dir: &Path) -> anyhow::Result<(PathBuf, Option<PathBuf>)> {
        let config = publish::publish_config(config_dir)?;
        let migration = publish::publish_migration(migrations_dir)?;
        Ok((config, migration))
    }
}
