//! Read-side relations from domain entities to their activity records.
//!
//! An entity opts in by implementing `CausesActivity` and/or `HasActivity`
//! (both have default bodies). The returned `MorphMany` targets whatever
//! activity model the `ActivityLog` is configured with.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::db::activities;
use crate::errors::ActivityResult;
use crate::models::{Activity, Loggable, ModelRef};
use crate::provider::ActivityLog;
use crate::registry::ActivityModel;

/// The polymorphic slot a relation matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphSlot {
    Subject,
    Causer,
    Entity,
}

impl MorphSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            MorphSlot::Subject => "subject",
            MorphSlot::Causer => "causer",
            MorphSlot::Entity => "entity",
        }
    }
}

/// One-to-many relation from an entity to the activity records whose `slot`
/// references it.
#[derive(Clone)]
pub struct MorphMany {
    pool: SqlitePool,
    model: Arc<dyn ActivityModel>,
    slot: MorphSlot,
    target: ModelRef,
    log_name: Option<String>,
}

impl MorphMany {
    pub fn new<M: Loggable>(activity_log: &ActivityLog, slot: MorphSlot, owner: &M) -> ActivityResult<Self> {
        Ok(Self {
            pool: activity_log.pool().clone(),
            model: activity_log.determine_activity_model()?,
            slot,
            target: ModelRef::new(M::entity_type(), owner.model_key()),
            log_name: None,
        })
    }

    pub fn slot(&self) -> MorphSlot {
        self.slot
    }

    pub fn table(&self) -> &str {
        self.model.table()
    }

    pub fn in_log(mut self, log_name: impl Into<String>) -> Self {
        self.log_name = Some(log_name.into());
        self
    }

    /// All matching records, newest first.
    pub async fn get(&self) -> ActivityResult<Vec<Activity>> {
        activities::for_morph(
            &self.pool,
            self.model.table(),
            self.slot.as_str(),
            &self.target,
            self.log_name.as_deref(),
            None,
        )
        .await
    }

    pub async fn latest(&self) -> ActivityResult<Option<Activity>> {
        let mut records = activities::for_morph(
            &self.pool,
            self.model.table(),
            self.slot.as_str(),
            &self.target,
            self.log_name.as_deref(),
            Some(1),
        )
        .await?;
        Ok(records.pop())
    }

    pub async fn count(&self) -> ActivityResult<i64> {
        activities::count_for_morph(
            &self.pool,
            self.model.table(),
            self.slot.as_str(),
            &self.target,
            self.log_name.as_deref(),
        )
        .await
    }
}

/// For actors: the records they caused.
pub trait CausesActivity: Loggable + Sized {
    fn activity(&self, activity_log: &ActivityLog) -> ActivityResult<MorphMany> {
        MorphMany::new(activity_log, MorphSlot::Causer, self)
    }

    #[deprecated(note = "use `activity` instead")]
    fn logged_activity(&self, activity_log: &ActivityLog) -> ActivityResult<MorphMany> {
        self.activity(activity_log)
    }
}

/// For entities that are routinely logged against and also act.
pub trait HasActivity: Loggable + Sized {
    /// Records this entity caused.
    fn actions(&self, activity_log: &ActivityLog) -> ActivityResult<MorphMany> {
        MorphMany::new(activity_log, MorphSlot::Causer, self)
    }

    /// Records performed on this entity.
    fn activities(&self, activity_log: &ActivityLog) -> ActivityResult<MorphMany> {
        MorphMany::new(activity_log, MorphSlot::Subject, self)
    }
}
