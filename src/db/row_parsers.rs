use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::errors::{ActivityLogError, ActivityResult};
use crate::models::{Activity, ModelRef, Properties};

fn parse_datetime(s: &str) -> ActivityResult<DateTime<Utc>> {
    let s = s.trim();

    // Try RFC3339 first (e.g. 2025-11-19T12:34:56Z)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try SQLite default timestamp format: "YYYY-MM-DD HH:MM:SS" (with optional fractional seconds)
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    // Try date-only format: "YYYY-MM-DD"
    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ActivityLogError::internal("invalid datetime: date out of range"))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(ActivityLogError::internal(format!("invalid datetime: {}", s)))
}

fn morph_from_row(row: &SqliteRow, slot: &str) -> ActivityResult<Option<ModelRef>> {
    let type_col = format!("{}_type", slot);
    let id_col = format!("{}_id", slot);
    let morph_type: Option<String> = row
        .try_get(type_col.as_str())
        .map_err(|e| ActivityLogError::internal(format!("missing {}: {}", type_col, e)))?;
    let morph_id: Option<String> = row
        .try_get(id_col.as_str())
        .map_err(|e| ActivityLogError::internal(format!("missing {}: {}", id_col, e)))?;

    Ok(match (morph_type, morph_id) {
        (Some(morph_type), Some(morph_id)) => Some(ModelRef::new(morph_type, morph_id)),
        _ => None,
    })
}

pub fn activity_from_row(row: &SqliteRow) -> ActivityResult<Activity> {
    let id_s: String = row.try_get("id").map_err(|e| ActivityLogError::internal(format!("missing id: {}", e)))?;
    let log_name: String = row.try_get("log_name").map_err(|e| ActivityLogError::internal(format!("missing log_name: {}", e)))?;
    let description: String = row.try_get("description").map_err(|e| ActivityLogError::internal(format!("missing description: {}", e)))?;
    let properties_s: Option<String> = row.try_get("properties").map_err(|e| ActivityLogError::internal(format!("missing properties: {}", e)))?;
    let created_at_s: String = row.try_get("created_at").map_err(|e| ActivityLogError::internal(format!("missing created_at: {}", e)))?;
    let updated_at_s: String = row.try_get("updated_at").map_err(|e| ActivityLogError::internal(format!("missing updated_at: {}", e)))?;

    let id = Uuid::parse_str(&id_s).map_err(|e| ActivityLogError::internal(format!("invalid uuid: {}", e)))?;
    let properties = match properties_s.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            Value::Null => Properties::new(),
            other => return Err(ActivityLogError::internal(format!("properties must be a JSON object, got {}", other))),
        },
        _ => Properties::new(),
    };

    Ok(Activity {
        id,
        log_name,
        description,
        subject: morph_from_row(row, "subject")?,
        causer: morph_from_row(row, "causer")?,
        entity: morph_from_row(row, "entity")?,
        properties,
        created_at: parse_datetime(&created_at_s)?,
        updated_at: parse_datetime(&updated_at_s)?,
    })
}

/// Converts an arbitrary row into a column → value map, following SQLite's
/// dynamic storage class of each value.
pub fn attributes_from_row(row: &SqliteRow) -> ActivityResult<Map<String, Value>> {
    let mut attributes = Map::new();

    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
                "REAL" => serde_json::Number::from_f64(row.try_get_unchecked::<f64, _>(idx)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => {
                    let bytes: Vec<u8> = row.try_get_unchecked(idx)?;
                    match Uuid::from_slice(&bytes) {
                        Ok(uuid) => Value::String(uuid.to_string()),
                        Err(_) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
                    }
                }
                _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
            }
        };

        attributes.insert(column.name().to_string(), value);
    }

    Ok(attributes)
}
