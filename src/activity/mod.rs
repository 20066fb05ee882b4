mod kinds;
mod logger;
pub mod repo;

pub use kinds::{label_for, ActivityKind};
pub use logger::{ActivityEvent, ActivityLogger};
pub use repo::{ActivityStats, ActivityView, UserActivity};
