pub mod audio_files;
pub mod audio_processing;
pub mod auth;
pub mod enrichment;
pub mod jobs;
pub mod notations;
pub mod roles;
pub mod users;
pub mod videos;
