//! Drumnote Core Library
//!
//! Domain models, error types, configuration, validation and the pure notation
//! builder shared by the database, service and API crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod notation;
pub mod validation;

pub use config::{Config, OpenAiConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
