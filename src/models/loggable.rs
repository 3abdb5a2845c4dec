use serde::Serialize;
use serde_json::{Map, Value};

/// Trait for domain entities that can be attached to an activity record as
/// subject, causer or contextual entity.
pub trait Loggable: Serialize + Send + Sync {
    /// The morph type stored in the `*_type` column (e.g. "task", "user").
    fn entity_type() -> &'static str;

    /// The primary key, stringified for the `*_id` column.
    fn model_key(&self) -> String;

    /// Field map used when resolving `:subject.*` / `:causer.*` placeholders.
    /// Defaults to the entity's serde serialization when that is an object.
    fn attributes(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
