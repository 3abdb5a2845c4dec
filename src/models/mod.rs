pub mod activity;
pub mod loggable;

pub use activity::{Activity, ModelRef, Properties};
pub use loggable::Loggable;
