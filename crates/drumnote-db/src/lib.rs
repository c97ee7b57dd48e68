//! Drumnote Database Layer
//!
//! sqlx/Postgres repositories for accounts, media, jobs and notations.

pub mod db;

// Re-exports: account repositories
pub use db::{RoleRepository, UserRepository};

// Re-exports: media repositories
pub use db::{
    AudioFileRepository, EnrichmentRepository, JobRepository, NotationRepository,
    VideoRepository,
};
pub use db::control::user::BootstrapRole;
pub use db::map_unique_violation;
pub use db::media::{notation::NewNotation, video::NewVideo};

// Re-exports: Transaction utilities
pub use db::transaction::TransactionGuard;
