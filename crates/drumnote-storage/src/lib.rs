//! Drumnote Storage Library
//!
//! Storage abstraction for uploaded media and its local filesystem implementation.
//!
//! # Storage key format
//!
//! - **Videos**: `videos/{user_id}/{uuid}.{ext}`
//! - **Audio files**: `audio/{video_id}/{uuid}.{ext}`
//!
//! Keys must not contain `..`, backslashes or a leading `/`. Key generation is
//! centralized in the `keys` module.

pub mod factory;
pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
