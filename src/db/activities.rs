use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::row_parsers::activity_from_row;
use super::timestamp;
use crate::errors::ActivityResult;
use crate::models::{Activity, ModelRef};

const SELECT_COLUMNS: &str = "id, log_name, description, subject_type, subject_id, causer_type, causer_id, entity_type, entity_id, properties, created_at, updated_at";

/// Inserts `activity` into `table`, stamping both timestamps.
///
/// `table` must come from a validated `ActivityModel`.
pub async fn insert(pool: &SqlitePool, table: &str, activity: &mut Activity) -> ActivityResult<()> {
    let now = Utc::now();
    activity.created_at = now;
    activity.updated_at = now;

    let properties = serde_json::to_string(&activity.properties)?;
    let sql = format!(
        "INSERT INTO {} (id, log_name, description, subject_type, subject_id, causer_type, causer_id, entity_type, entity_id, properties, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        table
    );

    sqlx::query(&sql)
        .bind(activity.id.to_string())
        .bind(&activity.log_name)
        .bind(&activity.description)
        .bind(activity.subject.as_ref().map(|m| m.morph_type.as_str()))
        .bind(activity.subject.as_ref().map(|m| m.id.as_str()))
        .bind(activity.causer.as_ref().map(|m| m.morph_type.as_str()))
        .bind(activity.causer.as_ref().map(|m| m.id.as_str()))
        .bind(activity.entity.as_ref().map(|m| m.morph_type.as_str()))
        .bind(activity.entity.as_ref().map(|m| m.id.as_str()))
        .bind(properties)
        .bind(timestamp(activity.created_at))
        .bind(timestamp(activity.updated_at))
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn find(pool: &SqlitePool, table: &str, id: Uuid) -> ActivityResult<Option<Activity>> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?", SELECT_COLUMNS, table);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(activity_from_row).transpose()
}

/// Records whose `slot` (`subject`, `causer` or `entity`) points at `target`,
/// newest first.
pub async fn for_morph(
    pool: &SqlitePool,
    table: &str,
    slot: &str,
    target: &ModelRef,
    log_name: Option<&str>,
    limit: Option<i64>,
) -> ActivityResult<Vec<Activity>> {
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {slot}_type = ? AND {slot}_id = ?",
        SELECT_COLUMNS,
        table,
        slot = slot
    );
    if log_name.is_some() {
        sql.push_str(" AND log_name = ?");
    }
    sql.push_str(" ORDER BY created_at DESC, rowid DESC");
    if limit.is_some() {
        sql.push_str(" LIMIT ?");
    }

    let mut query = sqlx::query(&sql).bind(&target.morph_type).bind(&target.id);
    if let Some(name) = log_name {
        query = query.bind(name);
    }
    if let Some(limit) = limit {
        query = query.bind(limit);
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(activity_from_row).collect()
}

pub async fn count_for_morph(
    pool: &SqlitePool,
    table: &str,
    slot: &str,
    target: &ModelRef,
    log_name: Option<&str>,
) -> ActivityResult<i64> {
    let mut sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {slot}_type = ? AND {slot}_id = ?",
        table,
        slot = slot
    );
    if log_name.is_some() {
        sql.push_str(" AND log_name = ?");
    }

    let mut query = sqlx::query_scalar::<sqlx::Sqlite, i64>(&sql).bind(&target.morph_type).bind(&target.id);
    if let Some(name) = log_name {
        query = query.bind(name);
    }

    Ok(query.fetch_one(pool).await?)
}
