use work_scheduler::{ExistingWorkPolicy, OperationState, WorkRequest, ops::WorkScheduler};

use crate::error::Error;

/// Enqueues unique work, preferring expedited execution when asked to.
///
/// When the scheduler rejects or fails an expedited request, the whole attempt is repeated
/// once with expedited execution turned off. Returns the request that was accepted.
pub async fn enqueue_work_with_fallback<F>(
    scheduler: &dyn WorkScheduler,
    unique_name: &str,
    policy: ExistingWorkPolicy,
    prefer_expedited: bool,
    build_request: F,
) -> Result<WorkRequest, Error>
where
    F: Fn(bool) -> WorkRequest,
{
    let mut use_expedited = prefer_expedited;

    loop {
        let request = build_request(use_expedited);
        tracing::debug!(
            unique_name,
            %policy,
            request_id = %request.id,
            expedited = use_expedited,
            "Enqueueing work"
        );

        let failure = match scheduler
            .enqueue_unique_work(unique_name, policy, request.clone())
            .await
        {
            Ok(OperationState::Success) => return Ok(request),
            Ok(OperationState::Failure(reason)) => Error::SchedulerError(reason),
            Err(e) => Error::from(e),
        };

        if use_expedited {
            tracing::warn!(
                unique_name,
                error = %failure,
                "Expedited enqueue failed, retrying as regular work"
            );
            use_expedited = false;
            continue;
        }

        tracing::error!(unique_name, error = %failure, "Enqueue failed");
        return Err(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use work_scheduler::mock::MockWorkScheduler;

    fn build(expedited: bool) -> WorkRequest {
        WorkRequest::new("upload").with_expedited(expedited)
    }

    #[async_std::test]
    async fn test_expedited_request_is_accepted() {
        let scheduler = MockWorkScheduler::new();

        let request =
            enqueue_work_with_fallback(&scheduler, "a", ExistingWorkPolicy::Keep, true, build)
                .await
                .unwrap();

        assert!(request.expedited);
        assert_eq!(scheduler.calls().len(), 1);
        assert_eq!(scheduler.pending("a"), vec![request]);
    }

    #[async_std::test]
    async fn test_falls_back_once_on_scheduler_error() {
        let scheduler = MockWorkScheduler::new();
        scheduler.error_on_expedited();

        let request =
            enqueue_work_with_fallback(&scheduler, "a", ExistingWorkPolicy::Keep, true, build)
                .await
                .unwrap();

        assert!(!request.expedited);
        let calls = scheduler.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].request.expedited);
        assert!(!calls[1].request.expedited);
    }

    #[async_std::test]
    async fn test_falls_back_on_failed_operation() {
        let scheduler = MockWorkScheduler::new();
        scheduler.fail_expedited();

        let request = enqueue_work_with_fallback(
            &scheduler,
            "a",
            ExistingWorkPolicy::AppendOrReplace,
            true,
            build,
        )
        .await
        .unwrap();

        assert!(!request.expedited);
        assert_eq!(scheduler.pending("a").len(), 1);
    }

    #[async_std::test]
    async fn test_gives_up_after_regular_attempt_fails() {
        let scheduler = MockWorkScheduler::new();
        scheduler.fail_all();

        let result =
            enqueue_work_with_fallback(&scheduler, "a", ExistingWorkPolicy::Keep, true, build)
                .await;

        assert!(matches!(result, Err(Error::SchedulerError(_))));
        assert_eq!(scheduler.calls().len(), 2);
    }

    #[async_std::test]
    async fn test_regular_request_is_not_retried() {
        let scheduler = MockWorkScheduler::new();
        scheduler.fail_all();

        let result =
            enqueue_work_with_fallback(&scheduler, "a", ExistingWorkPolicy::Keep, false, build)
                .await;

        assert!(result.is_err());
        assert_eq!(scheduler.calls().len(), 1);
    }
}
