pub mod auth;
pub mod clean;
pub mod config;
pub mod db;
pub mod errors;
pub mod jwt;
pub mod logger;
pub mod models;
pub mod provider;
pub mod publish;
pub mod registry;
pub mod relations;
pub mod status;

// Re-export commonly used items
pub use auth::{AuthManager, DatabaseGuard, Guard, MemoryGuard};
pub use config::ActivityConfig;
pub use errors::{ActivityLogError, ActivityResult};
pub use logger::{ActivityLogger, Causer};
pub use models::{Activity, Loggable, ModelRef, Properties};
pub use provider::ActivityLog;
pub use registry::{ActivityModel, ModelRegistry};
pub use relations::{CausesActivity, HasActivity, MorphMany};
pub use status::ActivityLogStatus;
