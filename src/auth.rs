//! Authentication contract consumed by the activity logger.
//!
//! A guard answers two questions: who is acting right now, and which actor
//! owns a given primary key. Guards are registered by name on an
//! `AuthManager`; the `ACTIVITY_AUTH_DRIVER` option picks one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::row_parsers::attributes_from_row;
use crate::errors::{ActivityLogError, ActivityResult};
use crate::models::{Loggable, ModelRef};

pub const DEFAULT_GUARD: &str = "web";

#[async_trait]
pub trait Guard: Send + Sync {
    /// The currently authenticated actor, if any.
    async fn user(&self) -> ActivityResult<Option<ModelRef>>;

    async fn retrieve_by_id(&self, id: &str) -> ActivityResult<Option<ModelRef>>;
}

#[derive(Clone)]
pub struct AuthManager {
    default_driver: String,
    guards: HashMap<String, Arc<dyn Guard>>,
}

impl AuthManager {
    pub fn new(default_driver: impl Into<String>) -> Self {
        Self {
            default_driver: default_driver.into(),
            guards: HashMap::new(),
        }
    }

    /// An auth manager whose only guard (`web`) knows nobody.
    pub fn guest() -> Self {
        Self::new(DEFAULT_GUARD).with_guard(DEFAULT_GUARD, MemoryGuard::new())
    }

    pub fn with_guard(mut self, name: impl Into<String>, guard: impl Guard + 'static) -> Self {
        self.guards.insert(name.into(), Arc::new(guard));
        self
    }

    pub fn default_driver(&self) -> &str {
        &self.default_driver
    }

    pub fn guard(&self, name: Option<&str>) -> ActivityResult<Arc<dyn Guard>> {
        let name = name.unwrap_or(&self.default_driver);
        self.guards
            .get(name)
            .cloned()
            .ok_or_else(|| ActivityLogError::AuthGuardNotDefined(name.to_string()))
    }
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::guest()
    }
}

/// Guard over an in-process set of actors, with an optional acting user.
#[derive(Debug, Clone, Default)]
pub struct MemoryGuard {
    users: HashMap<String, ModelRef>,
    current: Option<String>,
}

impl MemoryGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user<M: Loggable>(mut self, user: &M) -> Self {
        let user = ModelRef::from_model(user);
        self.users.insert(user.id.clone(), user);
        self
    }

    pub fn acting_as<M: Loggable>(mut self, user: &M) -> Self {
        let user = ModelRef::from_model(user);
        self.current = Some(user.id.clone());
        self.users.insert(user.id.clone(), user);
        self
    }
}

#[async_trait]
impl Guard for MemoryGuard {
    async fn user(&self) -> ActivityResult<Option<ModelRef>> {
        Ok(self
            .current
            .as_ref()
            .and_then(|id| self.users.get(id))
            .cloned())
    }

    async fn retrieve_by_id(&self, id: &str) -> ActivityResult<Option<ModelRef>> {
        Ok(self.users.get(id).cloned())
    }
}

/// Guard that looks actors up in an application table by primary key.
#[derive(Debug, Clone)]
pub struct DatabaseGuard {
    pool: SqlitePool,
    table: String,
    morph_type: String,
    current: Option<String>,
}

impl DatabaseGuard {
    /// `table` is interpolated into SQL and must be a trusted identifier.
    pub fn new(pool: SqlitePool, table: impl Into<String>, morph_type: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
            morph_type: morph_type.into(),
            current: None,
        }
    }

    pub fn acting_as(mut self, id: impl Into<String>) -> Self {
        self.current = Some(id.into());
        self
    }
}

#[async_trait]
impl Guard for DatabaseGuard {
    async fn user(&self) -> ActivityResult<Option<ModelRef>> {
        match self.current.as_deref() {
            Some(id) => self.retrieve_by_id(id).await,
            None => Ok(None),
        }
    }

    async fn retrieve_by_id(&self, id: &str) -> ActivityResult<Option<ModelRef>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", self.table);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => {
                let attributes = attributes_from_row(&row)?;
                Ok(Some(ModelRef::new(&self.morph_type, id).with_attributes(attributes)))
            }
            None => Ok(None),
        }
    }
}
