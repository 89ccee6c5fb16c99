use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    ExistingWorkPolicy, OperationState, WorkRequest, WorkSchedulerError, ops::WorkScheduler,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueCall {
    pub unique_name: String,
    pub policy: ExistingWorkPolicy,
    pub request: WorkRequest,
}

/// Internal state for MockWorkScheduler.
#[derive(Default)]
struct MockState {
    /// Every enqueue call, accepted or not
    calls: Vec<EnqueueCall>,
    /// Pending work by unique name
    pending: HashMap<String, Vec<WorkRequest>>,
    /// Expedited requests are rejected with an error
    error_on_expedited: bool,
    /// Expedited requests report a failed operation
    fail_expedited: bool,
    /// Every request reports a failed operation
    fail_all: bool,
}

/// Mock implementation of WorkScheduler for testing
///
/// Applies the unique work policies to an in-memory set of pending work and records every
/// call so tests can verify names, policies, tags and expedited flags.
#[derive(Clone, Default)]
pub struct MockWorkScheduler {
    state: Arc<Mutex<MockState>>,
}

impl MockWorkScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_on_expedited(&self) {
        let mut state = self.state.lock().unwrap();
        state.error_on_expedited = true;
    }

    pub fn fail_expedited(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_expedited = true;
    }

    pub fn fail_all(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_all = true;
    }

    pub fn calls(&self) -> Vec<EnqueueCall> {
        let state = self.state.lock().unwrap();
        state.calls.clone()
    }

    pub fn calls_for(&self, unique_name: &str) -> Vec<EnqueueCall> {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter(|call| call.unique_name == unique_name)
            .cloned()
            .collect()
    }

    /// Requests currently pending under `unique_name`
    pub fn pending(&self, unique_name: &str) -> Vec<WorkRequest> {
        let state = self.state.lock().unwrap();
        state.pending.get(unique_name).cloned().unwrap_or_default()
    }

    pub fn pending_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state.pending.keys().cloned().collect();
        names.sort();
        names
    }

    /// Simulate the scheduler finishing all work with `unique_name`
    pub fn complete(&self, unique_name: &str) {
        let mut state = self.state.lock().unwrap();
        state.pending.remove(unique_name);
    }
}

#[async_trait]
impl WorkScheduler for MockWorkScheduler {
    async fn enqueue_unique_work(
        &self,
        unique_name: &str,
        policy: ExistingWorkPolicy,
        request: WorkRequest,
    ) -> Result<OperationState, WorkSchedulerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EnqueueCall {
            unique_name: unique_name.to_string(),
            policy,
            request: request.clone(),
        });

        if request.expedited && state.error_on_expedited {
            return Err(WorkSchedulerError::ExpeditedQuotaExceeded);
        }
        if state.fail_all || (request.expedited && state.fail_expedited) {
            return Ok(OperationState::Failure(format!(
                "Mock enqueue failure for: {}",
                unique_name
            )));
        }

        let pending = state.pending.entry(unique_name.to_string()).or_default();
        match policy {
            ExistingWorkPolicy::Keep => {
                if pending.is_empty() {
                    pending.push(request);
                }
            }
            ExistingWorkPolicy::Replace => {
                pending.clear();
                pending.push(request);
            }
            ExistingWorkPolicy::AppendOrReplace => pending.push(request),
        }
        Ok(OperationState::Success)
    }
}
