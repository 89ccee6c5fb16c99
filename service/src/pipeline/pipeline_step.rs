use crate::error::Error;

/// What the pipeline does after a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Run the next step
    Continue,
    /// Stop without error; the step has recorded its result in the context
    Skip,
    /// Stop with an error
    Abort(Error),
}

/// One step of a [`super::Pipeline`].
///
/// Steps read their inputs from the context and write their results back to it. A step that
/// decides the final outcome stores it in the context and returns [`StepAction::Skip`].
#[async_trait::async_trait]
pub trait PipelineStep<T>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Checked before `execute`; a step returning `false` is passed over.
    fn should_execute(&self, _context: &T) -> bool {
        true
    }

    async fn execute(&self, context: &mut T) -> StepAction;
}
