//! Library rental server
//!
//! Book catalog, member profiles and the rental lifecycle over PostgreSQL,
//! exposed as a REST JSON API. Credentials are delegated to an external
//! identity provider.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub repository: repository::Repository,
}
