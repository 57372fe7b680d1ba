pub mod error;
pub mod filter;
pub mod frequency;
pub mod habit;
pub mod identity;
pub mod insights;
pub mod merge;
pub mod session;
pub mod store;
pub mod tracker;
pub mod week;

pub use crate::error::{HabitError, Result};
pub use crate::session::SessionContext;
pub use crate::tracker::{HabitTracker, HabitTrackerBuilder};
