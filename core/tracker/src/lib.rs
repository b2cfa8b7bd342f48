pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod progress;
pub mod service;

pub use api::{router, AppState};
pub use config::{Args, TrackerConfig};
pub use database::Database;
pub use error::{TrackerError, TrackerResult};
pub use service::{CategoryService, GoalService, ProgressService, StatsService};
