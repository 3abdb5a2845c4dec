use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;

pub const CONFIG_FILE: &str = "activitylog.env";
pub const MIGRATION_SUFFIX: &str = "_create_activity_log_table.sql";

const CONFIG_TEMPLATE: &str = "\
# When false no activity is written to the database.
ACTIVITY_LOGGER_ENABLED=true

# Log name used when none is given with `use_log` / `in_log`.
ACTIVITY_DEFAULT_LOG_NAME=default

# Auth guard used to find the current actor and to resolve causer ids.
# Leave empty to use the auth manager's default guard.
ACTIVITY_AUTH_DRIVER=

# Registry key of the activity model to persist. Empty means the base model.
ACTIVITY_MODEL=

# `activitylog clean` deletes records older than this many days...
ACTIVITY_CLEAN_DAYS=365

# ...optionally only for these comma separated log names.
ACTIVITY_CLEAN_LOG_NAMES=
";

const MIGRATION_TEMPLATE: &str = include_str!("../migrations/20240101000000_create_activity_log_table.sql");

/// Writes the config template into `dir`, overwriting an existing copy.
pub fn publish_config(dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let path = dir.join(CONFIG_FILE);
    fs::write(&path, CONFIG_TEMPLATE)
        .with_context(|| format!("failed to write config at {}", path.display()))?;

    Ok(path)
}

/// Writes a timestamped migration creating the activity table. Returns `None`
/// when `dir` already holds one.
pub fn publish_migration(dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    if let Some(existing) = existing_migration(dir)? {
        tracing::info!(path = %existing.display(), "activity migration already published");
        return Ok(None);
    }

    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let path = dir.join(format!("{}{}", timestamp, MIGRATION_SUFFIX));

    fs::write(&path, MIGRATION_TEMPLATE)
        .with_context(|| format!("failed to create migration at {}", path.display()))?;

    Ok(Some(path))
}

fn existing_migration(dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.ends_with(MIGRATION_SUFFIX));
        if matches {
            return Ok(Some(path));
        }
    }

    Ok(None)
}
