use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::db::timestamp;
use crate::errors::{ActivityLogError, ActivityResult};

/// Deletes records in `table` created more than `days` days ago, restricted
/// to `log_names` when it is non-empty. Returns the number of rows removed.
pub async fn clean_records(pool: &SqlitePool, table: &str, days: i64, log_names: &[String]) -> ActivityResult<u64> {
    if days < 0 {
        return Err(ActivityLogError::configuration("retention days must not be negative"));
    }

    let cutoff = Duration::try_days(days)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .ok_or_else(|| ActivityLogError::configuration("retention days out of range"))?;

    let mut sql = format!("DELETE FROM {} WHERE created_at < ?", table);
    if !log_names.is_empty() {
        let placeholders = vec!["?"; log_names.len()].join(", ");
        sql.push_str(&format!(" AND log_name IN ({})", placeholders));
    }

    let mut query = sqlx::query(&sql).bind(timestamp(cutoff));
    for name in log_names {
        query = query.bind(name);
    }

    let deleted = query.execute(pool).await?.rows_affected();

    tracing::info!(table, days, deleted, "cleaned old activity records");

    Ok(deleted)
}
