//! Storage backend construction from configuration

use std::sync::Arc;

use drumnote_core::Config;

use crate::local::LocalStorage;
use crate::traits::{Storage, StorageResult};

/// Build the configured storage backend
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(
        &config.local_storage_path,
        config.local_storage_base_url.clone(),
    )
    .await?;

    tracing::info!(
        path = %config.local_storage_path,
        "Local storage backend initialized"
    );

    Ok(Arc::new(storage))
}
