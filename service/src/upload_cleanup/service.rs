use std::sync::Arc;

use async_trait::async_trait;
use database::repository_manager::RepositoryManager;

use crate::{
    deletion::analytics::DeletionAnalytics,
    error::Error,
    pipeline::Pipeline,
    settings_service::SettingsService,
    upload_cleanup::{
        context::CleanupContext,
        handled_items::HandledItems,
        model::{CleanupResult, SkipReason, UploadSuccess, UploadSuccessListener},
        steps::{
            CheckAlreadyHandledStep, CheckAutoDeleteStep, EnqueueDeletionStep,
            LoadSettingsStep, LookupSourceStep, ResolveContentUriStep, ResolveMediaIdStep,
        },
    },
};

/// Puts uploaded originals on the deletion queue, at most once per upload item.
pub struct UploadCleanupCoordinator {
    repository_manager: Arc<RepositoryManager>,
    settings_service: Arc<SettingsService>,
    analytics: Arc<dyn DeletionAnalytics>,
    handled_items: Arc<HandledItems>,
    pipeline: Pipeline<CleanupContext>,
}

impl std::fmt::Debug for UploadCleanupCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCleanupCoordinator")
            .field("handled_items", &self.handled_items.len())
            .finish_non_exhaustive()
    }
}

impl UploadCleanupCoordinator {
    pub fn new(
        repository_manager: Arc<RepositoryManager>,
        settings_service: Arc<SettingsService>,
        analytics: Arc<dyn DeletionAnalytics>,
    ) -> Self {
        Self::with_handled_items(
            repository_manager,
            settings_service,
            analytics,
            Arc::new(HandledItems::default()),
        )
    }

    pub fn with_handled_items(
        repository_manager: Arc<RepositoryManager>,
        settings_service: Arc<SettingsService>,
        analytics: Arc<dyn DeletionAnalytics>,
        handled_items: Arc<HandledItems>,
    ) -> Self {
        let pipeline = Pipeline::with_steps(vec![
            Box::new(LoadSettingsStep),
            Box::new(CheckAutoDeleteStep),
            Box::new(CheckAlreadyHandledStep),
            Box::new(LookupSourceStep),
            Box::new(ResolveContentUriStep),
            Box::new(ResolveMediaIdStep),
            Box::new(EnqueueDeletionStep),
        ]);
        Self {
            repository_manager,
            settings_service,
            analytics,
            handled_items,
            pipeline,
        }
    }

    #[tracing::instrument(skip(self, upload), fields(item_id = upload.item_id))]
    pub async fn on_upload_succeeded(&self, upload: UploadSuccess) -> CleanupResult {
        let mut context = CleanupContext::new(
            upload,
            self.repository_manager.clone(),
            self.settings_service.clone(),
            self.handled_items.clone(),
            self.analytics.clone(),
        );

        let outcome = self.pipeline.execute(&mut context).await;
        match (outcome, context.result.take()) {
            (Ok(()), Some(result)) => result,
            (Ok(()), None) => {
                context.release_reservation();
                CleanupResult::Failure {
                    reason: SkipReason::EnqueueError,
                    error: Error::InvalidInput("cleanup finished without a result".to_string()),
                }
            }
            (Err(error), _) => {
                context.release_reservation();
                CleanupResult::Failure {
                    reason: SkipReason::EnqueueError,
                    error,
                }
            }
        }
    }
}

#[async_trait]
impl UploadSuccessListener for UploadCleanupCoordinator {
    async fn on_upload_succeeded(&self, success: UploadSuccess) {
        let result = UploadCleanupCoordinator::on_upload_succeeded(self, success).await;
        tracing::debug!(?result, "Upload success handled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deletion::analytics::mock::{AnalyticsEvent, RecordingAnalytics};
    use crate::upload_cleanup::model::{SuccessKind, UPLOADED_CLEANUP_REASON};
    use core_types::ContentUri;
    use database::{
        clock::FixedClock, models::UploadEnqueueRequest, setup_test_db,
    };
    use sqlx::{Pool, Sqlite};

    struct TestSetup {
        pool: Arc<Pool<Sqlite>>,
        repository_manager: Arc<RepositoryManager>,
        settings_service: Arc<SettingsService>,
        analytics: Arc<RecordingAnalytics>,
        coordinator: UploadCleanupCoordinator,
    }

    async fn setup(auto_delete: bool) -> TestSetup {
        setup_with_handled_items(auto_delete, Arc::new(HandledItems::default())).await
    }

    async fn setup_with_handled_items(
        auto_delete: bool,
        handled_items: Arc<HandledItems>,
    ) -> TestSetup {
        let pool = Arc::new(setup_test_db().await);
        let repository_manager = Arc::new(RepositoryManager::new_with_clock(
            pool.clone(),
            Arc::new(FixedClock::new(1_700_000_000_000)),
        ));
        let analytics = Arc::new(RecordingAnalytics::default());
        let settings_service = Arc::new(SettingsService::new(
            repository_manager.clone(),
            analytics.clone(),
        ));
        settings_service
            .set_auto_delete_after_upload(auto_delete)
            .await
            .unwrap();
        let coordinator = UploadCleanupCoordinator::with_handled_items(
            repository_manager.clone(),
            settings_service.clone(),
            analytics.clone(),
            handled_items,
        );
        TestSetup {
            pool,
            repository_manager,
            settings_service,
            analytics,
            coordinator,
        }
    }

    async fn enqueue_upload(setup: &TestSetup, photo_id: &str, media_id: i64) -> i64 {
        let uri =
            ContentUri::parse(&format!("content://media/external/images/media/{}", media_id))
                .unwrap();
        setup
            .repository_manager
            .get_upload_queue_repository()
            .enqueue(UploadEnqueueRequest {
                uri: &uri,
                idempotency_key: &format!("key-{}", photo_id),
                photo_id: Some(photo_id),
                display_name: Some("IMG_0001.jpg"),
                size: Some(4_096),
            })
            .await
            .unwrap()
    }

    fn success(item_id: i64, upload_uri: Option<&str>) -> UploadSuccess {
        UploadSuccess {
            item_id,
            upload_uri: upload_uri.map(str::to_string),
            display_name: Some("IMG_0001.jpg".to_string()),
            reported_size_bytes: None,
            http_code: Some(200),
            success_kind: SuccessKind::Uploaded,
        }
    }

    fn enqueued_events(analytics: &RecordingAnalytics) -> Vec<AnalyticsEvent> {
        analytics
            .events()
            .into_iter()
            .filter(|event| matches!(event, AnalyticsEvent::Enqueued(_)))
            .collect()
    }

    #[async_std::test]
    async fn test_enqueues_deletion_from_source_record() {
        let setup = setup(true).await;
        let item_id = enqueue_upload(&setup, "photo-1", 7).await;

        let result = setup
            .coordinator
            .on_upload_succeeded(success(item_id, None))
            .await;
        assert_eq!(
            result,
            CleanupResult::Success {
                media_id: 7,
                enqueued_count: 1
            }
        );

        let item = setup
            .repository_manager
            .get_deletion_queue_repository()
            .get_item(7)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.content_uri, "content://media/external/images/media/7");
        assert_eq!(item.reason, UPLOADED_CLEANUP_REASON);
        assert_eq!(item.size_bytes, Some(4_096));
        assert_eq!(item.display_name.as_deref(), Some("IMG_0001.jpg"));
        assert_eq!(enqueued_events(&setup.analytics), vec![AnalyticsEvent::Enqueued(1)]);
    }

    #[async_std::test]
    async fn test_second_success_for_same_item_is_already_processed() {
        let setup = setup(true).await;
        let item_id = enqueue_upload(&setup, "photo-1", 7).await;

        setup
            .coordinator
            .on_upload_succeeded(success(item_id, None))
            .await;
        let result = setup
            .coordinator
            .on_upload_succeeded(success(item_id, None))
            .await;

        assert_eq!(result, CleanupResult::Skipped(SkipReason::AlreadyProcessed));
        assert_eq!(
            setup
                .repository_manager
                .get_deletion_queue_repository()
                .count_pending()
                .await
                .unwrap(),
            1
        );
    }

    #[async_std::test]
    async fn test_concurrent_successes_for_same_item_enqueue_once() {
        let setup = setup(true).await;
        let item_id = enqueue_upload(&setup, "photo-1", 7).await;

        let (first, second) = futures::join!(
            setup
                .coordinator
                .on_upload_succeeded(success(item_id, None)),
            setup
                .coordinator
                .on_upload_succeeded(success(item_id, None)),
        );

        let results = [first, second];
        let successes = results
            .iter()
            .filter(|result| {
                **result
                    == CleanupResult::Success {
                        media_id: 7,
                        enqueued_count: 1,
                    }
            })
            .count();
        let already_processed = results
            .iter()
            .filter(|result| **result == CleanupResult::Skipped(SkipReason::AlreadyProcessed))
            .count();
        assert_eq!(successes, 1, "{:?}", results);
        assert_eq!(already_processed, 1, "{:?}", results);
        assert_eq!(enqueued_events(&setup.analytics).len(), 1);
    }

    #[async_std::test]
    async fn test_unresolved_media_id_does_not_mark_item_handled() {
        let handled_items = Arc::new(HandledItems::default());
        let setup = setup_with_handled_items(true, handled_items.clone()).await;
        let item_id = enqueue_upload(&setup, "photo-1", 7).await;

        let result = setup
            .coordinator
            .on_upload_succeeded(success(99, Some("file:///sdcard/DCIM/IMG_0001.jpg")))
            .await;
        assert_eq!(result, CleanupResult::Skipped(SkipReason::MissingMediaId));
        assert!(!handled_items.contains(99));

        let result = setup
            .coordinator
            .on_upload_succeeded(success(item_id, None))
            .await;
        assert_eq!(
            result,
            CleanupResult::Success {
                media_id: 7,
                enqueued_count: 1
            }
        );
        assert!(handled_items.contains(item_id));
    }

    #[async_std::test]
    async fn test_existing_queue_entry_is_duplicate_and_marks_handled() {
        let handled_items = Arc::new(HandledItems::default());
        let setup = setup_with_handled_items(true, handled_items.clone()).await;
        let item_id = enqueue_upload(&setup, "photo-1", 7).await;

        // another path already queued the original
        let other = UploadCleanupCoordinator::new(
            setup.repository_manager.clone(),
            setup.settings_service.clone(),
            setup.analytics.clone(),
        );
        other.on_upload_succeeded(success(item_id, None)).await;

        let result = setup
            .coordinator
            .on_upload_succeeded(success(item_id, None))
            .await;
        assert_eq!(result, CleanupResult::Skipped(SkipReason::EnqueueDuplicate));
        assert!(handled_items.contains(item_id));
    }

    #[async_std::test]
    async fn test_disabled_setting_skips() {
        let setup = setup(false).await;
        let item_id = enqueue_upload(&setup, "photo-1", 7).await;

        let result = setup
            .coordinator
            .on_upload_succeeded(success(item_id, None))
            .await;
        assert_eq!(result, CleanupResult::Skipped(SkipReason::SettingsDisabled));
        assert_eq!(
            setup
                .repository_manager
                .get_deletion_queue_repository()
                .count_pending()
                .await
                .unwrap(),
            0
        );
    }

    #[async_std::test]
    async fn test_settings_error_is_failure() {
        let setup = setup(true).await;
        setup.pool.close().await;

        let result = setup.coordinator.on_upload_succeeded(success(1, None)).await;
        assert!(matches!(
            result,
            CleanupResult::Failure {
                reason: SkipReason::SettingsError,
                ..
            }
        ));
    }

    #[async_std::test]
    async fn test_source_lookup_error_is_failure() {
        let setup = setup(true).await;
        sqlx::query("DROP TABLE upload_item")
            .execute(&*setup.pool)
            .await
            .unwrap();

        let result = setup.coordinator.on_upload_succeeded(success(1, None)).await;
        assert!(matches!(
            result,
            CleanupResult::Failure {
                reason: SkipReason::SourceLookupFailed,
                ..
            }
        ));
    }

    #[async_std::test]
    async fn test_missing_source_falls_back_to_upload_uri() {
        let setup = setup(true).await;

        let result = setup
            .coordinator
            .on_upload_succeeded(success(
                99,
                Some("content://com.android.providers.media.documents/document/image%3A55"),
            ))
            .await;
        assert_eq!(
            result,
            CleanupResult::Success {
                media_id: 55,
                enqueued_count: 1
            }
        );
    }

    #[async_std::test]
    async fn test_missing_content_uri_skips() {
        let setup = setup(true).await;

        let result = setup.coordinator.on_upload_succeeded(success(99, None)).await;
        assert_eq!(result, CleanupResult::Skipped(SkipReason::MissingContentUri));
    }

    #[async_std::test]
    async fn test_missing_media_id_skips() {
        let setup = setup(true).await;

        let result = setup
            .coordinator
            .on_upload_succeeded(success(99, Some("file:///sdcard/DCIM/IMG_0001.jpg")))
            .await;
        assert_eq!(result, CleanupResult::Skipped(SkipReason::MissingMediaId));
    }

    #[async_std::test]
    async fn test_upload_uri_media_id_wins_and_reported_size_is_used() {
        let setup = setup(true).await;
        let item_id = enqueue_upload(&setup, "photo-1", 7).await;
        let mut upload = success(item_id, Some("content://media/external/images/media/12"));
        upload.reported_size_bytes = Some(9_000);

        let result = setup.coordinator.on_upload_succeeded(upload).await;
        assert_eq!(
            result,
            CleanupResult::Success {
                media_id: 12,
                enqueued_count: 1
            }
        );
        let item = setup
            .repository_manager
            .get_deletion_queue_repository()
            .get_item(12)
            .await
            .unwrap()
            .unwrap();
        // content uri still comes from the source record
        assert_eq!(item.content_uri, "content://media/external/images/media/7");
        assert_eq!(item.size_bytes, Some(9_000));
    }

    #[async_std::test]
    async fn test_enqueue_error_is_failure() {
        let handled_items = Arc::new(HandledItems::default());
        let setup = setup_with_handled_items(true, handled_items.clone()).await;
        let item_id = enqueue_upload(&setup, "photo-1", 7).await;
        sqlx::query("DROP TABLE deletion_item")
            .execute(&*setup.pool)
            .await
            .unwrap();

        let result = setup
            .coordinator
            .on_upload_succeeded(success(item_id, None))
            .await;
        assert!(matches!(
            result,
            CleanupResult::Failure {
                reason: SkipReason::EnqueueError,
                ..
            }
        ));
        assert!(enqueued_events(&setup.analytics).is_empty());
        assert!(!handled_items.contains(item_id));
    }

    #[async_std::test]
    async fn test_evicted_item_is_checked_against_queue_again() {
        let handled_items = Arc::new(HandledItems::with_capacity(1));
        let setup = setup_with_handled_items(true, handled_items.clone()).await;
        let first = enqueue_upload(&setup, "photo-1", 7).await;
        let second = enqueue_upload(&setup, "photo-2", 8).await;

        setup.coordinator.on_upload_succeeded(success(first, None)).await;
        setup.coordinator.on_upload_succeeded(success(second, None)).await;
        assert!(!handled_items.contains(first));

        let result = setup.coordinator.on_upload_succeeded(success(first, None)).await;
        assert_eq!(result, CleanupResult::Skipped(SkipReason::EnqueueDuplicate));
    }
}
