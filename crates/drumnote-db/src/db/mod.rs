//! Database repositories for data access layer
//!
//! Repositories are organized into control/ (users, roles) and media/ (videos,
//! audio files, jobs, notations, enrichments). Each repository owns one table
//! and is cheap to clone.
//
// Account repositories
pub mod control;
//
// Media repositories
pub mod media;
//
// Transaction utilities
pub mod transaction;

pub use control::{RoleRepository, UserRepository};
pub use media::{
    AudioFileRepository, EnrichmentRepository, JobRepository, NotationRepository,
    VideoRepository,
};

use drumnote_core::AppError;

/// Turn a unique-constraint violation into a `BadRequest` with `message`.
///
/// Existence checks run before inserts, so this only fires when a concurrent
/// request wins the race for the same key.
pub fn map_unique_violation(err: AppError, message: &str) -> AppError {
    match err {
        AppError::Database(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
            AppError::BadRequest(message.to_string())
        }
        other => other,
    }
}
