use async_trait::async_trait;
use core_types::ContentUri;

use crate::{ConsentAction, MediaStoreError};

/// Trait for media store operations to enable testing
#[async_trait]
pub trait MediaStoreOps: Send + Sync {
    /// Delete a single media item.
    ///
    /// Returns the number of deleted rows: positive when deleted, zero when the item was
    /// already gone. Items owned by another app fail with
    /// [`MediaStoreError::RecoverableSecurity`] on platforms that support consent.
    async fn delete(&self, uri: &ContentUri) -> Result<i64, MediaStoreError>;

    /// Size of the item in bytes, `None` when unknown
    async fn query_size(&self, uri: &ContentUri) -> Result<Option<i64>, MediaStoreError>;

    /// Check if the item still exists in the media store
    async fn exists(&self, uri: &ContentUri) -> Result<bool, MediaStoreError>;

    /// Build one consent prompt that deletes all of `uris` when approved
    async fn create_delete_request(
        &self,
        uris: &[ContentUri],
    ) -> Result<ConsentAction, MediaStoreError>;
}
