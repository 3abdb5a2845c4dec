use crate::errors::{ActivityLogError, ActivityResult};

pub const DEFAULT_LOG_NAME: &str = "default";
pub const DEFAULT_CLEAN_DAYS: i64 = 365;

/// Options recognised by the activity logger. Mirrors the keys written by
/// `publish::publish_config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityConfig {
    pub enabled: bool,
    pub default_log_name: String,
    /// Guard used for the current actor and for id lookups. `None` means the
    /// auth manager's own default.
    pub default_auth_driver: Option<String>,
    /// Registry key of the activity model to persist. `None` means the base model.
    pub activity_model: Option<String>,
    pub delete_records_older_than_days: i64,
    pub clean_log_names: Vec<String>,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_log_name: DEFAULT_LOG_NAME.to_string(),
            default_auth_driver: None,
            activity_model: None,
            delete_records_older_than_days: DEFAULT_CLEAN_DAYS,
            clean_log_names: Vec::new(),
        }
    }
}

impl ActivityConfig {
    pub fn from_env() -> ActivityResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so callers (and tests)
    /// don't have to go through the process environment.
    pub fn from_lookup<F>(lookup: F) -> ActivityResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = match non_empty(lookup("ACTIVITY_LOGGER_ENABLED")) {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                ActivityLogError::configuration("ACTIVITY_LOGGER_ENABLED must be a boolean")
            })?,
            None => true,
        };

        let default_log_name = non_empty(lookup("ACTIVITY_DEFAULT_LOG_NAME"))
            .unwrap_or_else(|| DEFAULT_LOG_NAME.to_string());

        let delete_records_older_than_days = non_empty(lookup("ACTIVITY_CLEAN_DAYS"))
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(DEFAULT_CLEAN_DAYS))
            .map_err(|_| ActivityLogError::configuration("ACTIVITY_CLEAN_DAYS must be a valid integer"))?;

        let clean_log_names = lookup("ACTIVITY_CLEAN_LOG_NAMES")
            .map(|names| {
                names
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            enabled,
            default_log_name,
            default_auth_driver: non_empty(lookup("ACTIVITY_AUTH_DRIVER")),
            activity_model: non_empty(lookup("ACTIVITY_MODEL")),
            delete_records_older_than_days,
            clean_log_names,
        })
    }

    pub fn with_log_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.default_log_name = name;
        }
        self
    }

    pub fn with_auth_driver(mut self, driver: impl Into<String>) -> Self {
        self.default_auth_driver = Some(driver.into());
        self
    }

    pub fn with_activity_model(mut self, model: impl Into<String>) -> Self {
        self.activity_model = Some(model.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
