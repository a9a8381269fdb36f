//! Orgchart - organization structure service
//!
//! Departments form a strict tree (unique sibling names, no cycles) with
//! employees attached to them; a small plans catalog sits alongside.

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod hierarchy;
pub mod routes;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
