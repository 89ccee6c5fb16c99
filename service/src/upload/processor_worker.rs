use std::sync::Arc;

use core_types::UploadItemState;
use database::{
    models::{DeletionRequest, UploadQueueItem},
    repository_manager::RepositoryManager,
};
use work_scheduler::{ExistingWorkPolicy, WorkRequest, WorkResult, ops::WorkScheduler};

use crate::{
    deletion::analytics::DeletionAnalytics,
    error::Error,
    settings_service::SettingsService,
    upload::{
        constraints::UploadConstraints,
        task_runner::{UploadTaskParams, UploadTaskResult, UploadTaskRunner, failure_from_error},
    },
    upload_cleanup::{
        media_id::{extract_media_id, media_id_from_uri},
        model::{UPLOADED_CLEANUP_REASON, UploadSuccess, UploadSuccessListener},
    },
    view_models::Settings,
};

pub const UPLOAD_PROCESSOR_WORK_NAME: &str = "upload-processor";
const BATCH_SIZE: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Skipped,
    Succeeded,
    Failed { retryable: bool },
}

/// Uploads queued items in small batches and reschedules itself while work remains.
pub struct UploadProcessorWorker {
    repository_manager: Arc<RepositoryManager>,
    settings_service: Arc<SettingsService>,
    scheduler: Arc<dyn WorkScheduler>,
    task_runner: Arc<dyn UploadTaskRunner>,
    analytics: Arc<dyn DeletionAnalytics>,
    success_listener: Option<Arc<dyn UploadSuccessListener>>,
}

impl UploadProcessorWorker {
    pub fn new(
        repository_manager: Arc<RepositoryManager>,
        settings_service: Arc<SettingsService>,
        scheduler: Arc<dyn WorkScheduler>,
        task_runner: Arc<dyn UploadTaskRunner>,
        analytics: Arc<dyn DeletionAnalytics>,
    ) -> Self {
        Self {
            repository_manager,
            settings_service,
            scheduler,
            task_runner,
            analytics,
            success_listener: None,
        }
    }

    pub fn with_success_listener(mut self, listener: Arc<dyn UploadSuccessListener>) -> Self {
        self.success_listener = Some(listener);
        self
    }

    /// One run of the worker.
    pub async fn do_work(&self) -> WorkResult {
        match self.process_batch().await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Upload processor run failed");
                WorkResult::Retry
            }
        }
    }

    #[tracing::instrument(skip(self), err)]
    async fn process_batch(&self) -> Result<WorkResult, Error> {
        let upload_repository = self.repository_manager.get_upload_queue_repository();

        let recovered = upload_repository.recover_stuck_processing().await?;
        if recovered > 0 {
            tracing::warn!(recovered, "Requeued items stuck in processing");
        }

        let queued = upload_repository.fetch_queued(BATCH_SIZE, false).await?;
        tracing::info!(fetched = queued.len(), "Upload batch fetched");
        if queued.is_empty() {
            if upload_repository.has_queued().await? {
                self.enqueue_self().await?;
            }
            return Ok(WorkResult::Success);
        }

        let settings = self.settings_service.load_settings().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not load settings, keeping originals");
            Settings::default()
        });

        let mut should_retry = false;
        for item in &queued {
            let media_id = media_id_from_uri(&item.uri).or_else(|| extract_media_id(&item.photo_id));
            self.set_uploading(media_id, true).await;
            let outcome = self.process_item(item, media_id, &settings).await;
            self.set_uploading(media_id, false).await;

            if let ItemOutcome::Failed { retryable: true } = outcome? {
                should_retry = true;
            }
        }

        if upload_repository.has_queued().await? {
            self.enqueue_self().await?;
        }

        Ok(if should_retry {
            WorkResult::Retry
        } else {
            WorkResult::Success
        })
    }

    async fn process_item(
        &self,
        item: &UploadQueueItem,
        media_id: Option<i64>,
        settings: &Settings,
    ) -> Result<ItemOutcome, Error> {
        let upload_repository = self.repository_manager.get_upload_queue_repository();

        if !upload_repository.mark_processing(item.id).await? {
            tracing::info!(id = item.id, "Upload item changed state, skipping");
            return Ok(ItemOutcome::Skipped);
        }

        let params = UploadTaskParams {
            uri: item.uri.clone(),
            idempotency_key: item.idempotency_key.clone(),
            display_name: item.display_name.clone(),
        };
        let result = match self.task_runner.run(params).await {
            Ok(result) => result,
            Err(e) => failure_from_error(&e),
        };

        let is_processing =
            upload_repository.get_state(item.id).await? == Some(UploadItemState::Processing);

        match result {
            UploadTaskResult::Success {
                http_code,
                bytes_sent,
                success_kind,
            } => {
                if is_processing {
                    upload_repository.mark_succeeded(item.id).await?;
                }
                tracing::info!(id = item.id, uri = %item.uri, "Upload succeeded");

                if settings.auto_delete_after_upload {
                    self.enqueue_deletion(item, media_id).await;
                }
                if let Some(listener) = &self.success_listener {
                    listener
                        .on_upload_succeeded(UploadSuccess {
                            item_id: item.id,
                            upload_uri: Some(item.uri.to_string()),
                            display_name: Some(item.display_name.clone()),
                            reported_size_bytes: bytes_sent
                                .or((item.size > 0).then_some(item.size)),
                            http_code,
                            success_kind,
                        })
                        .await;
                }
                Ok(ItemOutcome::Succeeded)
            }
            UploadTaskResult::Failure {
                error_kind,
                http_code,
                retryable,
                message,
            } => {
                if !is_processing {
                    return Ok(ItemOutcome::Skipped);
                }
                upload_repository
                    .mark_failed(item.id, error_kind, http_code, retryable, message.as_deref())
                    .await?;
                tracing::warn!(
                    id = item.id,
                    uri = %item.uri,
                    %error_kind,
                    ?http_code,
                    retryable,
                    "Upload failed"
                );
                Ok(ItemOutcome::Failed { retryable })
            }
        }
    }

    async fn set_uploading(&self, media_id: Option<i64>, uploading: bool) {
        let Some(media_id) = media_id else {
            return;
        };
        if let Err(e) = self
            .repository_manager
            .get_deletion_queue_repository()
            .mark_uploading(&[media_id], uploading)
            .await
        {
            tracing::warn!(media_id, uploading, error = %e, "Could not update uploading flag");
        }
    }

    async fn enqueue_deletion(&self, item: &UploadQueueItem, media_id: Option<i64>) {
        let Some(media_id) = media_id else {
            tracing::info!(id = item.id, "No media id for uploaded item, keeping original");
            return;
        };
        let source = match self
            .repository_manager
            .get_upload_queue_repository()
            .find_source_for_item(item.id)
            .await
        {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(id = item.id, error = %e, "Source lookup failed");
                None
            }
        };
        let content_uri = source
            .as_ref()
            .and_then(|source| source.uri.clone())
            .unwrap_or_else(|| item.uri.clone());
        let size_bytes = source
            .as_ref()
            .and_then(|source| source.size_bytes)
            .or((item.size > 0).then_some(item.size));

        let request = DeletionRequest {
            media_id,
            content_uri: content_uri.to_string(),
            display_name: Some(item.display_name.clone()),
            size_bytes,
            date_taken: None,
            reason: UPLOADED_CLEANUP_REASON.to_string(),
        };
        match self
            .repository_manager
            .get_deletion_queue_repository()
            .enqueue(&[request])
            .await
        {
            Ok(0) => {}
            Ok(inserted) => {
                self.analytics.deletion_enqueued(inserted);
                tracing::info!(id = item.id, media_id, "Original queued for deletion");
            }
            Err(e) => {
                tracing::error!(id = item.id, media_id, error = %e, "Deletion enqueue failed")
            }
        }
    }

    async fn enqueue_self(&self) -> Result<(), Error> {
        let settings = self.settings_service.load_settings().await?;
        let request = WorkRequest::new(UPLOAD_PROCESSOR_WORK_NAME).with_constraints(
            UploadConstraints::from_settings(&settings).work_constraints(),
        );
        let request_id = request.id;
        self.scheduler
            .enqueue_unique_work(
                UPLOAD_PROCESSOR_WORK_NAME,
                ExistingWorkPolicy::AppendOrReplace,
                request,
            )
            .await?;
        tracing::info!(%request_id, "Upload processor rescheduled");
        Ok(())
    }
}
