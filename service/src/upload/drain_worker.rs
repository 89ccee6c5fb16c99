use std::sync::{Arc, Mutex, OnceLock};

use core_types::UploadErrorKind;
use database::repository_manager::RepositoryManager;
use work_scheduler::{ExistingWorkPolicy, WorkRequest, WorkResult, ops::WorkScheduler};

use crate::{
    error::Error,
    settings_service::SettingsService,
    upload::{
        constraints::UploadConstraints,
        enqueue_helper::enqueue_work_with_fallback,
        tags::{TAG_DRAIN, UploadWorkKind, UploadWorkMetadata, unique_name_for_uri},
    },
};

pub const QUEUE_DRAIN_WORK_NAME: &str = "queue-drain";
/// Worker name of the per item upload requests.
pub const UPLOAD_WORKER_NAME: &str = "upload";
pub const MAX_ATTEMPTS_BEFORE_FAILURE: u32 = 3;
const BATCH_SIZE: i64 = 5;

static PROCESS_RESCHEDULE_STATE: OnceLock<DrainRescheduleState> = OnceLock::new();

/// Wifi-only value of the last drain reschedule. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct DrainRescheduleState {
    last_wifi_only: Arc<Mutex<Option<bool>>>,
}

impl DrainRescheduleState {
    /// The record shared by every drain worker of this process.
    pub fn process_wide() -> Self {
        PROCESS_RESCHEDULE_STATE.get_or_init(Self::default).clone()
    }

    pub fn last_wifi_only(&self) -> Option<bool> {
        *self
            .last_wifi_only
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn policy_for(&self, wifi_only: bool) -> ExistingWorkPolicy {
        match self.last_wifi_only() {
            Some(previous) if previous != wifi_only => ExistingWorkPolicy::Replace,
            _ => ExistingWorkPolicy::AppendOrReplace,
        }
    }

    fn record(&self, wifi_only: bool) {
        *self
            .last_wifi_only
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(wifi_only);
    }
}

/// Hands queued items over to per item upload work.
pub struct QueueDrainWorker {
    repository_manager: Arc<RepositoryManager>,
    settings_service: Arc<SettingsService>,
    scheduler: Arc<dyn WorkScheduler>,
    reschedule_state: DrainRescheduleState,
}

impl QueueDrainWorker {
    pub fn new(
        repository_manager: Arc<RepositoryManager>,
        settings_service: Arc<SettingsService>,
        scheduler: Arc<dyn WorkScheduler>,
    ) -> Self {
        Self::with_reschedule_state(
            repository_manager,
            settings_service,
            scheduler,
            DrainRescheduleState::process_wide(),
        )
    }

    pub fn with_reschedule_state(
        repository_manager: Arc<RepositoryManager>,
        settings_service: Arc<SettingsService>,
        scheduler: Arc<dyn WorkScheduler>,
        reschedule_state: DrainRescheduleState,
    ) -> Self {
        Self {
            repository_manager,
            settings_service,
            scheduler,
            reschedule_state,
        }
    }

    /// One run of the worker. `run_attempt_count` is how often the scheduler already retried it.
    pub async fn do_work(&self, run_attempt_count: u32) -> WorkResult {
        match self.drain().await {
            Ok(()) => WorkResult::Success,
            Err(e) => {
                let will_retry = run_attempt_count < MAX_ATTEMPTS_BEFORE_FAILURE;
                tracing::error!(error = %e, run_attempt_count, will_retry, "Queue drain failed");
                if will_retry {
                    WorkResult::Retry
                } else {
                    WorkResult::Failure(e.to_string())
                }
            }
        }
    }

    #[tracing::instrument(skip(self), err)]
    async fn drain(&self) -> Result<(), Error> {
        let upload_repository = self.repository_manager.get_upload_queue_repository();

        upload_repository.recover_stuck_processing().await?;
        let queued = upload_repository.fetch_queued(BATCH_SIZE, false).await?;
        tracing::info!(fetched = queued.len(), "Drain batch fetched");

        let settings = self.settings_service.load_settings().await?;
        let constraints = UploadConstraints::from_settings(&settings);

        if queued.is_empty() {
            if upload_repository.has_queued().await? {
                self.enqueue_self(constraints).await?;
            }
            return Ok(());
        }

        let mut enqueue_failures = 0;
        for item in &queued {
            if !upload_repository.mark_processing(item.id).await? {
                tracing::info!(id = item.id, "Upload item changed state, skipping");
                continue;
            }

            let unique_name = unique_name_for_uri(&item.uri);
            let tags = UploadWorkMetadata {
                unique_name: Some(unique_name.clone()),
                uri: Some(item.uri.clone()),
                display_name: Some(item.display_name.clone()),
                idempotency_key: Some(item.idempotency_key.clone()),
                kind: UploadWorkKind::Upload,
            }
            .tags();

            let enqueued = enqueue_work_with_fallback(
                self.scheduler.as_ref(),
                &unique_name,
                ExistingWorkPolicy::Keep,
                constraints.prefer_expedited(),
                |expedited| {
                    WorkRequest::new(UPLOAD_WORKER_NAME)
                        .with_tags(tags.clone())
                        .with_constraints(constraints.work_constraints())
                        .with_expedited(expedited)
                },
            )
            .await;
            match enqueued {
                Ok(request) => tracing::info!(
                    id = item.id,
                    unique_name,
                    expedited = request.expedited,
                    "Upload work enqueued"
                ),
                Err(e) => {
                    tracing::warn!(
                        id = item.id,
                        unique_name,
                        error = %e,
                        "Upload work not enqueued, requeueing item"
                    );
                    enqueue_failures += 1;
                    upload_repository
                        .mark_failed(
                            item.id,
                            UploadErrorKind::Unexpected,
                            None,
                            true,
                            Some(&e.to_string()),
                        )
                        .await?;
                }
            }
        }

        // the retried run picks the requeued items up again
        if enqueue_failures > 0 {
            return Err(Error::SchedulerError(format!(
                "{} of {} upload requests could not be enqueued",
                enqueue_failures,
                queued.len()
            )));
        }

        if upload_repository.has_queued().await? {
            self.enqueue_self(constraints).await?;
        }
        Ok(())
    }

    async fn enqueue_self(&self, constraints: UploadConstraints) -> Result<(), Error> {
        let policy = self.reschedule_state.policy_for(constraints.wifi_only);
        let request = WorkRequest::new(QUEUE_DRAIN_WORK_NAME)
            .with_tags(vec![TAG_DRAIN.to_string()])
            .with_constraints(constraints.work_constraints());
        let request_id = request.id;

        self.scheduler
            .enqueue_unique_work(QUEUE_DRAIN_WORK_NAME, policy, request)
            .await?;
        self.reschedule_state.record(constraints.wifi_only);

        tracing::info!(%policy, %request_id, "Queue drain rescheduled");
        Ok(())
    }
}
