use async_trait::async_trait;

use crate::{ExistingWorkPolicy, OperationState, WorkRequest, WorkSchedulerError};

/// Trait for background work scheduling to enable testing
#[async_trait]
pub trait WorkScheduler: Send + Sync {
    /// Enqueue work under a unique name, resolving conflicts with `policy`
    async fn enqueue_unique_work(
        &self,
        unique_name: &str,
        policy: ExistingWorkPolicy,
        request: WorkRequest,
    ) -> Result<OperationState, WorkSchedulerError>;
}
