use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::loggable::Loggable;

/// Insertion-ordered free-form payload stored with each record.
pub type Properties = Map<String, Value>;

/// A resolved polymorphic reference: morph type, primary key and, when the
/// reference was associated in-process, the entity's attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    pub morph_type: String,
    pub id: String,
    /// Empty for references read back from storage.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl ModelRef {
    pub fn new(morph_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            morph_type: morph_type.into(),
            id: id.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn from_model<M: Loggable>(model: &M) -> Self {
        Self::new(M::entity_type(), model.model_key()).with_attributes(model.attributes())
    }

    pub fn is<M: Loggable>(&self, model: &M) -> bool {
        self.morph_type == M::entity_type() && self.id == model.model_key()
    }
}

/// One audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub log_name: String,
    pub description: String,
    pub subject: Option<ModelRef>,
    pub causer: Option<ModelRef>,
    pub entity: Option<ModelRef>,
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// A fresh, unsaved record. Timestamps are restamped by the store on insert.
    pub fn new(log_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            log_name: log_name.into(),
            description: String::new(),
            subject: None,
            causer: None,
            entity: None,
            properties: Properties::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn subject_is<M: Loggable>(&self, model: &M) -> bool {
        self.subject.as_ref().map_or(false, |subject| subject.is(model))
    }

    pub fn caused_by<M: Loggable>(&self, model: &M) -> bool {
        self.causer.as_ref().map_or(false, |causer| causer.is(model))
    }
}
