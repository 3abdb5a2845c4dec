use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide switch deciding whether `ActivityLogger::log` persists anything.
///
/// Clones share the same flag, so disabling logging through one builder
/// suppresses it for every builder handed out by the same `ActivityLog`
/// until it is enabled again.
#[derive(Debug, Clone)]
pub struct ActivityLogStatus {
    enabled: Arc<AtomicBool>,
}

impl ActivityLogStatus {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        tracing::debug!("activity logging enabled");
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        tracing::debug!("activity logging disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_disabled(&self) -> bool {
        !self.is_enabled()
    }
}

impl Default for ActivityLogStatus {
    fn default() -> Self {
        Self::new(true)
    }
}
