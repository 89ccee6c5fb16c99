use std::sync::Arc;

use core_types::ContentUri;
use database::{models::UploadSourceInfo, repository_manager::RepositoryManager};

use crate::{
    deletion::analytics::DeletionAnalytics,
    settings_service::SettingsService,
    upload_cleanup::{
        handled_items::HandledItems,
        model::{CleanupResult, SkipReason, UploadSuccess},
    },
    view_models::Settings,
};

/// Context object that flows through the cleanup pipeline, accumulating state
pub struct CleanupContext {
    pub upload: UploadSuccess,
    pub repository_manager: Arc<RepositoryManager>,
    pub settings_service: Arc<SettingsService>,
    pub handled_items: Arc<HandledItems>,
    pub analytics: Arc<dyn DeletionAnalytics>,

    // Accumulated state as pipeline progresses
    pub settings: Option<Settings>,
    pub source: Option<UploadSourceInfo>,
    pub content_uri: Option<ContentUri>,
    pub media_id: Option<i64>,
    pub result: Option<CleanupResult>,
    /// Set when this run holds the item id in `handled_items`
    pub reserved: bool,
}

impl CleanupContext {
    pub fn new(
        upload: UploadSuccess,
        repository_manager: Arc<RepositoryManager>,
        settings_service: Arc<SettingsService>,
        handled_items: Arc<HandledItems>,
        analytics: Arc<dyn DeletionAnalytics>,
    ) -> Self {
        Self {
            upload,
            repository_manager,
            settings_service,
            handled_items,
            analytics,
            settings: None,
            source: None,
            content_uri: None,
            media_id: None,
            result: None,
            reserved: false,
        }
    }

    pub fn skip(&mut self, reason: SkipReason) {
        tracing::debug!(item_id = self.upload.item_id, ?reason, "Cleanup skipped");
        if matches!(
            reason,
            SkipReason::MissingContentUri | SkipReason::MissingMediaId
        ) {
            self.release_reservation();
        }
        self.result = Some(CleanupResult::Skipped(reason));
    }

    pub fn fail(&mut self, reason: SkipReason, error: crate::error::Error) {
        tracing::warn!(item_id = self.upload.item_id, ?reason, %error, "Cleanup failed");
        self.release_reservation();
        self.result = Some(CleanupResult::Failure { reason, error });
    }

    /// Gives the item id back so a later success for the same item is handled again.
    pub fn release_reservation(&mut self) {
        if self.reserved {
            self.handled_items.release(self.upload.item_id);
            self.reserved = false;
        }
    }
}
