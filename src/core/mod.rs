//! Core business logic abstractions

pub mod config;
pub mod error;
pub mod guide;
pub mod log;
pub mod models;
pub mod series;
pub mod store;
pub mod tracker;
pub mod valuation;

// Re-export main types for cleaner imports
pub use error::{Result, TrackerError};
pub use store::{Authenticator, Session, TrackerStore};
pub use valuation::DerivedMetrics;
