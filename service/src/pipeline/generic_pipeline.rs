use super::pipeline_step::{PipelineStep, StepAction};
use crate::error::Error;

/// Runs a fixed sequence of steps over a shared context.
///
/// Execution stops at the first step returning `Skip` (success) or `Abort` (error).
pub struct Pipeline<T> {
    pub steps: Vec<Box<dyn PipelineStep<T>>>,
}

impl<T: Send> Pipeline<T> {
    pub fn with_steps(steps: Vec<Box<dyn PipelineStep<T>>>) -> Self {
        Self { steps }
    }

    pub async fn execute(&self, context: &mut T) -> Result<(), Error> {
        for step in &self.steps {
            if !step.should_execute(context) {
                tracing::debug!(step = step.name(), "Step not applicable, passing over");
                continue;
            }

            tracing::debug!(step = step.name(), "Executing step");

            match step.execute(context).await {
                StepAction::Continue => continue,
                StepAction::Skip => {
                    tracing::debug!(step = step.name(), "Step finished the pipeline early");
                    return Ok(());
                }
                StepAction::Abort(error) => {
                    tracing::error!(step = step.name(), %error, "Step aborted the pipeline");
                    return Err(error);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trace {
        visited: Vec<&'static str>,
    }

    struct Record(&'static str, StepAction);

    #[async_trait::async_trait]
    impl PipelineStep<Trace> for Record {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn execute(&self, context: &mut Trace) -> StepAction {
            context.visited.push(self.0);
            self.1.clone()
        }
    }

    struct Never;

    #[async_trait::async_trait]
    impl PipelineStep<Trace> for Never {
        fn name(&self) -> &'static str {
            "never"
        }

        fn should_execute(&self, _context: &Trace) -> bool {
            false
        }

        async fn execute(&self, context: &mut Trace) -> StepAction {
            context.visited.push("never");
            StepAction::Continue
        }
    }

    #[async_std::test]
    async fn test_skip_stops_without_error() {
        let pipeline = Pipeline::with_steps(vec![
            Box::new(Record("first", StepAction::Continue)),
            Box::new(Never),
            Box::new(Record("second", StepAction::Skip)),
            Box::new(Record("third", StepAction::Continue)),
        ]);
        let mut trace = Trace::default();
        pipeline.execute(&mut trace).await.unwrap();
        assert_eq!(trace.visited, vec!["first", "second"]);
    }

    #[async_std::test]
    async fn test_abort_returns_error() {
        let pipeline = Pipeline::with_steps(vec![
            Box::new(Record("first", StepAction::Abort(Error::OperationCancelled))),
            Box::new(Record("second", StepAction::Continue)),
        ]);
        let mut trace = Trace::default();
        assert_eq!(
            pipeline.execute(&mut trace).await,
            Err(Error::OperationCancelled)
        );
        assert_eq!(trace.visited, vec!["first"]);
    }
}
