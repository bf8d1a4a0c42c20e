//! BRACU Loop Common Library
//!
//! Shared code for the BRACU Loop services including:
//! - Database models and repository patterns
//! - Review threading and vote bookkeeping
//! - Identity gating, sessions and ban evaluation
//! - Moderation, uploads, room availability and contact handling
//! - Email notification templates and delivery
//! - Error types, configuration and metrics

pub mod auth;
pub mod config;
pub mod contact;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod moderation;
pub mod notify;
pub mod reviews;
pub mod rooms;
pub mod storage;
pub mod suggestions;
pub mod uploads;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use notify::Mailer;
pub use storage::ObjectStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application display name used in emails and logs
pub const APP_NAME: &str = "BRACU Loop";

/// Email domain accepted at sign-in unless configured otherwise
pub const DEFAULT_ALLOWED_DOMAIN: &str = "g.bracu.ac.bd";
