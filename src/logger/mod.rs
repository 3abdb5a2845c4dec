//! The fluent activity builder.
//!
//! ```rust,no_run
//! # use activitylog::{ActivityLog, ActivityResult, Loggable};
//! # async fn example<P: Loggable>(activity: &ActivityLog, post: &P) -> ActivityResult<()> {
//! activity
//!     .logger()
//!     .await?
//!     .performed_on(post)
//!     .with_property("ip", "10.0.0.1")
//!     .in_log("posts")
//!     .caused_by(42)
//!     .await?
//!     .log("published :subject.title from :properties.ip")
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod placeholders;

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::auth::Guard;
use crate::config::DEFAULT_LOG_NAME;
use crate::db::activities;
use crate::errors::{ActivityLogError, ActivityResult};
use crate::models::{Activity, Loggable, ModelRef, Properties};
use crate::provider::ActivityLog;
use crate::status::ActivityLogStatus;

pub use placeholders::replace_placeholders;

/// Anything `caused_by` accepts: a resolved actor, a primary key to look up
/// through the guard, or nothing at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Causer {
    Model(ModelRef),
    Id(String),
    Absent,
}

impl Causer {
    fn id(id: String) -> Self {
        if id.trim().is_empty() {
            Causer::Absent
        } else {
            Causer::Id(id)
        }
    }
}

impl From<ModelRef> for Causer {
    fn from(value: ModelRef) -> Self {
        Causer::Model(value)
    }
}

impl<M: Loggable> From<&M> for Causer {
    fn from(value: &M) -> Self {
        Causer::Model(ModelRef::from_model(value))
    }
}

impl From<i64> for Causer {
    fn from(value: i64) -> Self {
        Causer::Id(value.to_string())
    }
}

impl From<u64> for Causer {
    fn from(value: u64) -> Self {
        Causer::Id(value.to_string())
    }
}

impl From<i32> for Causer {
    fn from(value: i32) -> Self {
        Causer::Id(value.to_string())
    }
}

impl From<Uuid> for Causer {
    fn from(value: Uuid) -> Self {
        Causer::Id(value.to_string())
    }
}

impl From<String> for Causer {
    fn from(value: String) -> Self {
        Causer::id(value)
    }
}

impl From<&str> for Causer {
    fn from(value: &str) -> Self {
        Causer::id(value.to_string())
    }
}

impl<C: Into<Causer>> From<Option<C>> for Causer {
    fn from(value: Option<C>) -> Self {
        value.map(Into::into).unwrap_or(Causer::Absent)
    }
}

pub struct ActivityLogger {
    activity_log: ActivityLog,
    guard: Arc<dyn Guard>,
    status: ActivityLogStatus,
    log_name: String,
    performed_on: Option<ModelRef>,
    caused_by: Option<ModelRef>,
    entity_for: Option<ModelRef>,
    properties: Properties,
}

impl ActivityLogger {
    /// `causer` is the default actor, normally the guard's current user.
    pub fn new(activity_log: ActivityLog, guard: Arc<dyn Guard>, causer: Option<ModelRef>) -> Self {
        let status = activity_log.status().clone();
        let log_name = activity_log.config().default_log_name.clone();

        Self {
            activity_log,
            guard,
            status,
            log_name,
            performed_on: None,
            caused_by: causer,
            entity_for: None,
            properties: Properties::new(),
        }
    }

    pub fn set_log_status(mut self, status: ActivityLogStatus) -> Self {
        self.status = status;
        self
    }

    pub fn performed_on<M: Loggable>(mut self, model: &M) -> Self {
        self.performed_on = Some(ModelRef::from_model(model));
        self
    }

    pub fn on<M: Loggable>(self, model: &M) -> Self {
        self.performed_on(model)
    }

    pub fn entity_for<M: Loggable>(mut self, model: &M) -> Self {
        self.entity_for = Some(ModelRef::from_model(model));
        self
    }

    pub fn for_entity<M: Loggable>(self, model: &M) -> Self {
        self.entity_for(model)
    }

    /// Sets the causer. Ids are resolved through the configured guard;
    /// `Causer::Absent` keeps whatever causer is already set.
    pub async fn caused_by(mut self, causer: impl Into<Causer>) -> ActivityResult<Self> {
        match causer.into() {
            Causer::Absent => {}
            Causer::Model(model) => self.caused_by = Some(model),
            Causer::Id(id) => match self.guard.retrieve_by_id(&id).await? {
                Some(model) => self.caused_by = Some(model),
                None => return Err(ActivityLogError::could_not_determine_user(id)),
            },
        }

        Ok(self)
    }

    pub async fn by(self, causer: impl Into<Causer>) -> ActivityResult<Self> {
        self.caused_by(causer).await
    }

    pub fn with_properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.properties = properties
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    pub fn with<I, K, V>(self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.with_properties(properties)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn use_log(mut self, log_name: impl Into<String>) -> Self {
        self.log_name = log_name.into();
        self
    }

    pub fn in_log(self, log_name: impl Into<String>) -> Self {
        self.use_log(log_name)
    }

    pub fn enable_logging(self) -> Self {
        self.status.enable();
        self
    }

    pub fn disable_logging(self) -> Self {
        self.status.disable();
        self
    }

    /// Builds and stores the record. Returns `None` without touching the
    /// database while logging is disabled.
    pub async fn log(self, description: &str) -> ActivityResult<Option<Activity>> {
        if self.status.is_disabled() {
            tracing::debug!(log_name = %self.log_name, "activity logging disabled, skipping");
            return Ok(None);
        }

        let model = self.activity_log.determine_activity_model()?;

        let log_name = [self.log_name.as_str(), self.activity_log.config().default_log_name.as_str()]
            .into_iter()
            .find(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_LOG_NAME)
            .to_string();

        let mut activity = model.new_instance(&log_name);

        if let Some(subject) = self.performed_on {
            activity.subject = Some(subject);
        }

        if let Some(causer) = self.caused_by {
            activity.causer = Some(causer);
        }

        if let Some(entity) = self.entity_for {
            activity.entity = Some(entity);
        }

        activity.properties = self.properties;

        activity.description = replace_placeholders(description, &activity);

        activity.log_name = log_name;

        activities::insert(self.activity_log.pool(), model.table(), &mut activity).await?;

        tracing::debug!(
            id = %activity.id,
            log_name = %activity.log_name,
            table = model.table(),
            "activity recorded"
        );

        Ok(Some(activity))
    }
}
