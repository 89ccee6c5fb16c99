use std::{
    collections::{BTreeSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use async_std::channel::{Receiver, Sender};
use database::{
    models::DeletionItem, repository::deletion_queue_repository::DeletionQueueRepository,
};
use futures::StreamExt;

use crate::{
    deletion::{
        confirm_deletion::ConfirmDeletionUseCase,
        model::{BatchProcessingResult, DeleteBatch, Outcome, PrepareResult},
    },
    error::Error,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionConfirmationUiState {
    pub pending_count: usize,
    pub pending_bytes_approx: i64,
    pub in_progress: bool,
}

impl DeletionConfirmationUiState {
    pub fn is_confirm_enabled(&self) -> bool {
        self.pending_count > 0 && !self.in_progress
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeletionConfirmationEvent {
    RequestPermission(BTreeSet<String>),
    LaunchBatch(DeleteBatch),
    FinalSuccess {
        confirmed_count: usize,
        freed_bytes: i64,
        failed_count: usize,
        skipped_count: usize,
    },
    FinalFailure(Error),
}

#[derive(Default)]
struct ConfirmationState {
    ui: DeletionConfirmationUiState,
    queued_batches: VecDeque<DeleteBatch>,
    outcome: Outcome,
    requested_permissions: BTreeSet<String>,
}

/// Drives the confirmation screen: pending totals, the permission prompt and the sequence of
/// consent batches. One-off instructions for the host are sent as
/// [`DeletionConfirmationEvent`]s.
pub struct DeletionConfirmationViewModel {
    use_case: Arc<ConfirmDeletionUseCase>,
    repository: Arc<DeletionQueueRepository>,
    chunk_size: usize,
    state: Mutex<ConfirmationState>,
    events: Sender<DeletionConfirmationEvent>,
}

impl DeletionConfirmationViewModel {
    /// Creates the view model, reconciles the queue with the media store and loads the
    /// pending totals.
    pub async fn new(
        use_case: Arc<ConfirmDeletionUseCase>,
        repository: Arc<DeletionQueueRepository>,
        chunk_size: usize,
    ) -> (Self, Receiver<DeletionConfirmationEvent>) {
        let (events, receiver) = async_std::channel::unbounded();
        let view_model = Self {
            use_case,
            repository,
            chunk_size,
            state: Mutex::new(ConfirmationState::default()),
            events,
        };
        if let Err(e) = view_model.use_case.reconcile_pending().await {
            tracing::warn!(error = %e, "Reconciling pending deletions failed");
        }
        view_model.refresh().await;
        (view_model, receiver)
    }

    pub fn ui_state(&self) -> DeletionConfirmationUiState {
        self.lock().ui
    }

    /// Re-reads the pending list.
    pub async fn refresh(&self) {
        match self.repository.get_pending().await {
            Ok(items) => self.apply_pending(&items),
            Err(e) => tracing::warn!(error = %e, "Loading pending deletions failed"),
        }
    }

    /// Keeps the pending totals current until the repository goes away.
    pub async fn watch_pending(&self) {
        let mut pending = Box::pin(self.repository.observe_pending());
        while let Some(result) = pending.next().await {
            match result {
                Ok(items) => self.apply_pending(&items),
                Err(e) => tracing::warn!(error = %e, "Observing pending deletions failed"),
            }
        }
    }

    pub async fn confirm_pending(&self) {
        {
            let mut state = self.lock();
            if state.ui.in_progress || state.ui.pending_count == 0 {
                return;
            }
            state.ui.in_progress = true;
            state.queued_batches.clear();
            state.outcome = Outcome::default();
        }
        self.run_prepare(false).await;
    }

    pub async fn handle_permission_result(&self, granted: bool) {
        if !self.lock().ui.in_progress {
            return;
        }
        if granted {
            self.run_prepare(true).await;
        } else {
            let requested = std::mem::take(&mut self.lock().requested_permissions);
            let denied = requested.into_iter().collect::<Vec<_>>().join(", ");
            self.fail(Error::PermissionDenied(denied)).await;
        }
    }

    pub async fn handle_batch_result(
        &self,
        batch: &DeleteBatch,
        result_code: i32,
        data: Option<&str>,
    ) {
        match self
            .use_case
            .handle_batch_result(batch, result_code, data)
            .await
        {
            Ok(BatchProcessingResult::Cancelled) => self.fail(Error::OperationCancelled).await,
            Ok(BatchProcessingResult::Completed(outcome)) => {
                self.lock().outcome += outcome;
                self.launch_next_or_finish().await;
            }
            Err(e) => self.fail(e).await,
        }
    }

    async fn run_prepare(&self, permission_just_granted: bool) {
        match self.use_case.prepare(self.chunk_size).await {
            Ok(PrepareResult::NoPending) => {
                self.lock().ui.in_progress = false;
                self.refresh().await;
            }
            Ok(PrepareResult::PermissionRequired(permissions)) => {
                if permission_just_granted {
                    let missing = permissions.into_iter().collect::<Vec<_>>().join(", ");
                    self.fail(Error::PermissionDenied(missing)).await;
                } else {
                    self.lock().requested_permissions = permissions.clone();
                    self.emit(DeletionConfirmationEvent::RequestPermission(permissions))
                        .await;
                }
            }
            Ok(PrepareResult::Ready {
                batches,
                initial_outcome,
            }) => {
                {
                    let mut state = self.lock();
                    state.queued_batches = batches.into();
                    state.outcome = initial_outcome;
                }
                self.launch_next_or_finish().await;
            }
            Err(e) => self.fail(e).await,
        }
    }

    async fn launch_next_or_finish(&self) {
        let next = self.lock().queued_batches.pop_front();
        if let Some(batch) = next {
            self.emit(DeletionConfirmationEvent::LaunchBatch(batch))
                .await;
            return;
        }

        let outcome = {
            let mut state = self.lock();
            state.ui.in_progress = false;
            state.outcome
        };
        if outcome.has_changes() {
            self.emit(DeletionConfirmationEvent::FinalSuccess {
                confirmed_count: outcome.confirmed_count,
                freed_bytes: outcome.freed_bytes,
                failed_count: outcome.failed_count,
                skipped_count: outcome.skipped_count,
            })
            .await;
        }
        self.refresh().await;
    }

    async fn fail(&self, error: Error) {
        {
            let mut state = self.lock();
            state.ui.in_progress = false;
            state.queued_batches.clear();
            state.outcome = Outcome::default();
        }
        self.emit(DeletionConfirmationEvent::FinalFailure(error))
            .await;
        self.refresh().await;
    }

    async fn emit(&self, event: DeletionConfirmationEvent) {
        self.events.send(event).await.ok();
    }

    fn apply_pending(&self, items: &[DeletionItem]) {
        let pending_bytes_approx = items
            .iter()
            .filter_map(|item| item.size_bytes)
            .filter(|size| *size > 0)
            .sum();
        let mut state = self.lock();
        state.ui.pending_count = items.len();
        state.ui.pending_bytes_approx = pending_bytes_approx;
    }

    fn lock(&self) -> MutexGuard<'_, ConfirmationState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
