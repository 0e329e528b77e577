//! Shared errors and configuration for Pokeria.
//!
//! This crate provides what every other crate needs:
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;

pub use config::{AppConfig, ComparisonMode, TailPolicy};
pub use error::{AppError, AppResult};
