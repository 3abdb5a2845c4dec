//! Resolution of the concrete activity model an application persists.
//!
//! Applications register extra models under a key and select one with the
//! `ACTIVITY_MODEL` option. Every registered model is checked against the
//! record shape the logger writes before it is handed out.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{ActivityLogError, ActivityResult};
use crate::models::Activity;

pub const BASE_MODEL: &str = "activity";
pub const BASE_TABLE: &str = "activity_log";

/// Columns every activity table must carry.
pub const REQUIRED_COLUMNS: [&str; 12] = [
    "id",
    "log_name",
    "description",
    "subject_type",
    "subject_id",
    "causer_type",
    "causer_id",
    "entity_type",
    "entity_id",
    "properties",
    "created_at",
    "updated_at",
];

pub trait ActivityModel: Send + Sync {
    /// Registry key, matched against the `ACTIVITY_MODEL` option.
    fn name(&self) -> &str;

    fn table(&self) -> &str;

    fn columns(&self) -> Vec<&str> {
        REQUIRED_COLUMNS.to_vec()
    }

    /// A blank, unsaved record.
    fn new_instance(&self, log_name: &str) -> Activity {
        Activity::new(log_name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BaseActivityModel;

impl ActivityModel for BaseActivityModel {
    fn name(&self) -> &str {
        BASE_MODEL
    }

    fn table(&self) -> &str {
        BASE_TABLE
    }
}

/// A model that stores the base record shape in another table.
#[derive(Debug, Clone)]
pub struct TableActivityModel {
    name: String,
    table: String,
}

impl TableActivityModel {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
        }
    }
}

impl ActivityModel for TableActivityModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn table(&self) -> &str {
        &self.table
    }
}

#[derive(Clone)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn ActivityModel>>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        let mut models: HashMap<String, Arc<dyn ActivityModel>> = HashMap::new();
        models.insert(BASE_MODEL.to_string(), Arc::new(BaseActivityModel));
        Self { models }
    }

    /// Registers `model` under its own name, replacing any previous entry.
    pub fn register(mut self, model: impl ActivityModel + 'static) -> Self {
        self.models.insert(model.name().to_string(), Arc::new(model));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Returns the model selected by `configured`, or the base model when unset.
    pub fn determine_activity_model(&self, configured: Option<&str>) -> ActivityResult<Arc<dyn ActivityModel>> {
        let name = configured
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(BASE_MODEL);

        let model = self
            .models
            .get(name)
            .cloned()
            .ok_or_else(|| ActivityLogError::invalid_configuration(name))?;

        if !is_valid_shape(model.as_ref()) {
            return Err(ActivityLogError::invalid_configuration(name));
        }

        Ok(model)
    }
}

fn is_valid_shape(model: &dyn ActivityModel) -> bool {
    if !is_identifier(model.table()) {
        return false;
    }

    let columns = model.columns();
    REQUIRED_COLUMNS.iter().all(|required| columns.contains(required))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
