//! Storage setup and initialization

use anyhow::{Context, Result};
use gala_core::Config;
use gala_storage::{LocalStorage, Storage};
use std::sync::Arc;

/// Setup the storage backend and verify the directory is writable.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!(path = %config.storage_path(), "Initializing local storage...");

    let base_url = format!("{}/files", config.public_base_url().trim_end_matches('/'));
    let storage = LocalStorage::new(config.storage_path(), base_url)
        .await
        .context("Failed to initialize local storage")?;

    // Catch permission problems at startup instead of on the first upload.
    let probe = storage.base_path().join(".write-test");
    tokio::fs::write(&probe, b"ok")
        .await
        .with_context(|| format!("Storage directory {} is not writable", config.storage_path()))?;
    tokio::fs::remove_file(&probe)
        .await
        .context("Failed to remove storage write probe")?;

    tracing::info!("Storage initialized successfully");

    Ok(Arc::new(storage))
}
