// Model of the platform's background work facility: unique named work, per call conflict
// policies, network constraints and expedited execution. Workers talk to it through
// `ops::WorkScheduler`.

pub mod mock;
pub mod ops;

use std::time::Duration;

use strum_macros::Display;

/// What happens when unique work with the same name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ExistingWorkPolicy {
    /// Keep the existing work and drop the new request
    Keep,
    /// Cancel the existing work and enqueue the new request
    Replace,
    /// Run the new request after the existing work, or replace it when it already finished
    AppendOrReplace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum NetworkType {
    #[default]
    Connected,
    Unmetered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkConstraints {
    pub network_type: NetworkType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkRequest {
    pub id: uuid::Uuid,
    /// Name of the worker that executes the request
    pub worker: String,
    pub tags: Vec<String>,
    pub constraints: WorkConstraints,
    pub expedited: bool,
    pub initial_delay: Option<Duration>,
}

impl WorkRequest {
    pub fn new(worker: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            worker: worker.into(),
            tags: Vec::new(),
            constraints: WorkConstraints::default(),
            expedited: false,
            initial_delay: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_constraints(mut self, constraints: WorkConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_expedited(mut self, expedited: bool) -> Self {
        self.expedited = expedited;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Outcome of submitting work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    Success,
    Failure(String),
}

/// What a worker reports back to the scheduler after one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkResult {
    Success,
    Retry,
    Failure(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WorkSchedulerError {
    #[error("Quota exceeded for expedited work")]
    ExpeditedQuotaExceeded,

    #[error("Scheduler error: {0}")]
    Other(String),
}
