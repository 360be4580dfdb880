//! Per-day review activity for heatmaps and streaks

mod models;
mod storage;
pub mod streak;

pub use models::*;
pub use storage::{ActivityError, ActivityStorage, MAX_WINDOW_DAYS};
