use std::{collections::BTreeSet, sync::Arc};

use core_types::ContentUri;
use database::{
    models::DeletionItem, repository::deletion_queue_repository::DeletionQueueRepository,
};
use media_store::{
    MediaStoreError,
    ops::MediaStoreOps,
    permission::PermissionChecker,
    platform::{DeletionMode, PlatformVersion, deletion_mode, required_read_permission},
};

use crate::{
    deletion::{
        analytics::DeletionAnalytics,
        model::{
            BatchItem, BatchProcessingResult, DELETE_FAILED_CAUSE, DeleteBatch, Outcome,
            PrepareResult, RESULT_OK,
        },
    },
    error::Error,
};

/// Items sorted by how the media store resolved them.
#[derive(Default)]
struct Resolutions<'a> {
    deleted: Vec<&'a BatchItem>,
    failed: Vec<&'a BatchItem>,
    skipped: Vec<&'a BatchItem>,
}

impl<'a> Resolutions<'a> {
    /// Classifies a delete row count: positive deleted, zero already gone, negative failed.
    fn record_delete(&mut self, item: &'a BatchItem, rows: i64) {
        if rows > 0 {
            self.deleted.push(item);
        } else if rows == 0 {
            self.skipped.push(item);
        } else {
            self.failed.push(item);
        }
    }
}

/// Deletes queued originals from the media store with the user's consent.
///
/// The flow has two phases. [`ConfirmDeletionUseCase::prepare`] turns the pending queue into
/// consent batches (deleting directly where the platform allows it), and the host reports each
/// prompt's result to [`ConfirmDeletionUseCase::handle_batch_result`].
pub struct ConfirmDeletionUseCase {
    repository: Arc<DeletionQueueRepository>,
    media_store: Arc<dyn MediaStoreOps>,
    permissions: Arc<dyn PermissionChecker>,
    platform_version: PlatformVersion,
    analytics: Arc<dyn DeletionAnalytics>,
}

impl ConfirmDeletionUseCase {
    pub fn new(
        repository: Arc<DeletionQueueRepository>,
        media_store: Arc<dyn MediaStoreOps>,
        permissions: Arc<dyn PermissionChecker>,
        platform_version: PlatformVersion,
        analytics: Arc<dyn DeletionAnalytics>,
    ) -> Self {
        Self {
            repository,
            media_store,
            permissions,
            platform_version,
            analytics,
        }
    }

    #[tracing::instrument(skip(self), fields(platform_version = self.platform_version), err)]
    pub async fn prepare(&self, chunk_size: usize) -> Result<PrepareResult, Error> {
        let permission = required_read_permission(self.platform_version);
        if !self.permissions.is_granted(permission) {
            tracing::info!(permission, "Read permission missing, deletion not started");
            return Ok(PrepareResult::PermissionRequired(BTreeSet::from([
                permission.to_string(),
            ])));
        }

        let pending = self.repository.get_pending().await?;
        if pending.is_empty() {
            return Ok(PrepareResult::NoPending);
        }

        let items = self.build_batch_items(pending).await;
        if items.is_empty() {
            return Ok(PrepareResult::NoPending);
        }

        match deletion_mode(self.platform_version) {
            DeletionMode::Modern => self.prepare_batched(items, chunk_size).await,
            DeletionMode::Legacy => self.prepare_direct(items).await,
        }
    }

    /// Applies the result of the consent prompt for `batch`.
    #[tracing::instrument(skip(self, batch, data), fields(batch_id = %batch.id, items = batch.items.len()), err)]
    pub async fn handle_batch_result(
        &self,
        batch: &DeleteBatch,
        result_code: i32,
        data: Option<&str>,
    ) -> Result<BatchProcessingResult, Error> {
        if result_code != RESULT_OK {
            tracing::info!(result_code, "Deletion batch was not approved");
            self.analytics.deletion_cancelled(&batch.id);
            return Ok(BatchProcessingResult::Cancelled);
        }
        if let Some(data) = data {
            tracing::debug!(data, "Consent result data");
        }

        let mut resolutions = Resolutions::default();
        if batch.requires_retry_after_approval {
            for item in &batch.items {
                match self.media_store.delete(&item.uri).await {
                    Ok(rows) => resolutions.record_delete(item, rows),
                    Err(e) => {
                        tracing::warn!(media_id = item.item.media_id, error = %e, "Delete after approval failed");
                        resolutions.failed.push(item);
                    }
                }
            }
        } else {
            for item in &batch.items {
                if self.is_missing_from_store(&item.uri).await {
                    resolutions.deleted.push(item);
                } else {
                    resolutions.failed.push(item);
                }
            }
        }

        let outcome = self.apply_resolutions(&resolutions).await?;
        Ok(BatchProcessingResult::Completed(outcome))
    }

    /// Marks pending items that are already gone from the media store as confirmed.
    #[tracing::instrument(skip(self), err)]
    pub async fn reconcile_pending(&self) -> Result<usize, Error> {
        let pending = self.repository.get_pending().await?;
        let mut missing = Vec::new();
        for item in &pending {
            let Ok(uri) = ContentUri::parse(&item.content_uri) else {
                continue;
            };
            if self.is_missing_from_store(&uri).await {
                missing.push(item.media_id);
            }
        }
        if missing.is_empty() {
            return Ok(0);
        }

        self.repository.mark_confirmed(&missing).await?;
        tracing::info!(
            reconciled = missing.len(),
            "Pending deletions already removed from the media store"
        );
        Ok(missing.len())
    }

    async fn prepare_batched(
        &self,
        items: Vec<BatchItem>,
        chunk_size: usize,
    ) -> Result<PrepareResult, Error> {
        let mut batches = Vec::new();
        for (index, chunk) in items.chunks(chunk_size.max(1)).enumerate() {
            let uris: Vec<ContentUri> = chunk.iter().map(|item| item.uri.clone()).collect();
            let action = self.media_store.create_delete_request(&uris).await?;
            batches.push(DeleteBatch::new(index, chunk.to_vec(), action, false));
        }
        tracing::info!(
            batches = batches.len(),
            items = items.len(),
            "Prepared batched delete requests"
        );
        Ok(PrepareResult::Ready {
            batches,
            initial_outcome: Outcome::default(),
        })
    }

    async fn prepare_direct(&self, items: Vec<BatchItem>) -> Result<PrepareResult, Error> {
        let mut resolutions = Resolutions::default();
        let mut batches = Vec::new();

        for (index, item) in items.iter().enumerate() {
            match self.media_store.delete(&item.uri).await {
                Ok(rows) => resolutions.record_delete(item, rows),
                Err(MediaStoreError::RecoverableSecurity(action)) => {
                    batches.push(DeleteBatch::new(
                        index,
                        vec![item.clone()],
                        action,
                        true,
                    ));
                }
                Err(e) => {
                    tracing::warn!(media_id = item.item.media_id, error = %e, "Direct delete failed");
                    resolutions.failed.push(item);
                }
            }
        }

        let initial_outcome = self.apply_resolutions(&resolutions).await?;
        if batches.is_empty() && !initial_outcome.has_changes() {
            return Ok(PrepareResult::NoPending);
        }
        Ok(PrepareResult::Ready {
            batches,
            initial_outcome,
        })
    }

    async fn build_batch_items(&self, pending: Vec<DeletionItem>) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(pending.len());
        for item in pending {
            match ContentUri::parse(&item.content_uri) {
                Ok(uri) => {
                    let resolved_size = self.resolve_size(&uri, item.size_bytes).await;
                    items.push(BatchItem {
                        item,
                        uri,
                        resolved_size,
                    });
                }
                Err(e) => {
                    tracing::warn!(media_id = item.media_id, error = %e, "Dropping item with invalid URI");
                }
            }
        }
        items
    }

    async fn resolve_size(&self, uri: &ContentUri, stored: Option<i64>) -> Option<i64> {
        if let Some(size) = stored.filter(|size| *size > 0) {
            return Some(size);
        }
        match self.media_store.query_size(uri).await {
            Ok(size) => size,
            Err(e) => {
                tracing::debug!(%uri, error = %e, "Could not resolve size");
                None
            }
        }
    }

    async fn is_missing_from_store(&self, uri: &ContentUri) -> bool {
        match self.media_store.exists(uri).await {
            Ok(exists) => !exists,
            Err(e) => {
                tracing::warn!(%uri, error = %e, "Existence check failed, treating item as present");
                false
            }
        }
    }

    async fn apply_resolutions(&self, resolutions: &Resolutions<'_>) -> Result<Outcome, Error> {
        let freed_bytes: i64 = resolutions
            .deleted
            .iter()
            .filter_map(|item| item.resolved_size)
            .filter(|size| *size > 0)
            .sum();

        if !resolutions.deleted.is_empty() {
            self.repository
                .mark_confirmed(&media_ids(&resolutions.deleted))
                .await?;
            self.analytics
                .deletion_confirmed(resolutions.deleted.len(), freed_bytes);
        }
        if !resolutions.failed.is_empty() {
            self.repository
                .mark_failed(&media_ids(&resolutions.failed), DELETE_FAILED_CAUSE)
                .await?;
            self.analytics.deletion_failed(resolutions.failed.len());
        }
        if !resolutions.skipped.is_empty() {
            self.repository
                .mark_skipped(&media_ids(&resolutions.skipped))
                .await?;
        }

        let outcome = Outcome {
            confirmed_count: resolutions.deleted.len(),
            failed_count: resolutions.failed.len(),
            skipped_count: resolutions.skipped.len(),
            freed_bytes,
        };
        if outcome.has_changes() {
            let remaining = self.repository.count_pending().await?;
            tracing::info!(
                confirmed = outcome.confirmed_count,
                failed = outcome.failed_count,
                skipped = outcome.skipped_count,
                freed_bytes,
                remaining,
                "Deletion queue updated"
            );
        }
        Ok(outcome)
    }
}

fn media_ids(items: &[&BatchItem]) -> Vec<i64> {
    items.iter().map(|item| item.item.media_id).collect()
}
