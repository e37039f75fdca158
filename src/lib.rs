//! Minigram Premium - expiring cache and mock premium-subscription service
//!
//! Provides a TTL cache, a mock payment simulator and a subscription manager
//! behind a JSON/HTTP API. Nothing here moves real money.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod payment;
pub mod premium;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{AppError, Result};
pub use tasks::spawn_cleanup_task;
