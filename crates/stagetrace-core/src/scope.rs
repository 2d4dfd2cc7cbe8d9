//! Scoped execution: push a stage, run work, always pop it.
//!
//! Work runs with the tree borrowed mutably so it can open nested stages.
//! Both returned errors and panics count as failures. A failure is logged
//! together with the active stack at the point of failure, the stage is
//! popped, and then the [`WorkErrorPolicy`] decides whether the caller sees
//! it as an error.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use stagetrace_types::{StageId, StageKind, StageSummary};
use tracing::{error, warn};

use crate::config::WorkErrorPolicy;
use crate::error::{SuppressedWorkError, TreeError};
use crate::stage::TickStage;
use crate::tree::StageTree;

/// How a scoped stage finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The work returned successfully.
    Completed,
    /// The work failed; the failure was logged and swallowed.
    Suppressed(Box<SuppressedWorkError>),
}

impl StageOutcome {
    /// Whether the work failed.
    pub const fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed(_))
    }
}

impl StageTree {
    /// Push `id`, run its `pre_tick` hook and `work`, and pop `id` whatever
    /// either of them did.
    ///
    /// If the push itself is rejected neither the hook nor the work runs and
    /// nothing is popped. A failing hook counts as a failure of the work.
    /// Stages the work left on the stack above `id` are popped first so the
    /// stack returns to its depth before the call.
    pub fn with_stage<E, F>(&mut self, id: StageId, work: F) -> Result<StageOutcome, TreeError>
    where
        E: core::fmt::Display,
        F: FnOnce(&mut Self) -> Result<(), E>,
    {
        self.enter(id)?;
        let failure = self.run_work(id, work);
        self.unwind_to(id)?;
        self.settle(failure)
    }

    /// Register `stage` under the current top and run it via
    /// [`with_stage`](Self::with_stage).
    pub fn run_stage<E, F>(
        &mut self,
        stage: impl TickStage + 'static,
        work: F,
    ) -> Result<StageOutcome, TreeError>
    where
        E: core::fmt::Display,
        F: FnOnce(&mut Self) -> Result<(), E>,
    {
        let id = self.register_child(stage)?;
        self.with_stage(id, work)
    }

    /// Number of scoped work units that failed, suppressed or not.
    pub const fn work_failure_count(&self) -> u64 {
        self.work_failures
    }

    /// The most recent scoped work failure.
    pub const fn last_work_failure(&self) -> Option<&SuppressedWorkError> {
        self.last_work_failure.as_ref()
    }

    /// The configured failure policy.
    pub const fn work_error_policy(&self) -> WorkErrorPolicy {
        self.work_errors
    }

    /// Run the `pre_tick` hook and then the work of an entered stage,
    /// catching errors and panics from both.
    pub(crate) fn run_work<E, F>(&mut self, id: StageId, work: F) -> Option<SuppressedWorkError>
    where
        E: core::fmt::Display,
        F: FnOnce(&mut Self) -> Result<(), E>,
    {
        let result = panic::catch_unwind(AssertUnwindSafe(|| -> Result<(), String> {
            self.run_pre_tick(id).map_err(|e| e.to_string())?;
            work(&mut *self).map_err(|e| e.to_string())
        }));
        let (message, panicked) = match result {
            Ok(Ok(())) => return None,
            Ok(Err(message)) => (message, false),
            Err(payload) => (panic_message(payload.as_ref()), true),
        };

        let active_stack = self.stack_snapshot();
        let stage = self.summary(id).unwrap_or_else(|| StageSummary {
            id,
            kind: StageKind::Custom(String::from("unknown")),
            label: String::from("<cleared>"),
            depth: 0,
        });

        error!(stage = %stage, panicked, error = %message, "Exception in stage");
        error!("Active stages:");
        for active in &active_stack {
            error!("  {active}");
        }

        let failure = SuppressedWorkError {
            stage,
            message,
            panicked,
            active_stack,
        };
        self.work_failures = self.work_failures.saturating_add(1);
        self.last_work_failure = Some(failure.clone());
        Some(failure)
    }

    /// Pop until `id` has been popped.
    pub(crate) fn unwind_to(&mut self, id: StageId) -> Result<(), TreeError> {
        if !self.is_active(id) {
            warn!(stage = %id, "Scoped stage was already popped by its work");
            return Ok(());
        }
        loop {
            let popped = self.pop()?;
            if popped == id {
                return Ok(());
            }
            warn!(stage = %popped, scope = %id, "Popped a stage left open inside scoped work");
        }
    }

    /// Apply the failure policy to a finished unit of work.
    pub(crate) fn settle(
        &self,
        failure: Option<SuppressedWorkError>,
    ) -> Result<StageOutcome, TreeError> {
        match (failure, self.work_errors) {
            (None, _) => Ok(StageOutcome::Completed),
            (Some(failure), WorkErrorPolicy::Suppress) => {
                Ok(StageOutcome::Suppressed(Box::new(failure)))
            }
            (Some(failure), WorkErrorPolicy::Propagate) => {
                Err(TreeError::WorkFailed(Box::new(failure)))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("non-string panic payload"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::{DebugContext, YieldPump};
    use crate::stage::MarkerStage;

    fn tree() -> StageTree {
        StageTree::new(Arc::new(DebugContext::new()), YieldPump)
    }

    fn root(tree: &mut StageTree) -> StageId {
        tree.register(None, MarkerStage::server_root()).unwrap()
    }

    /// Stage whose `pre_tick` hook panics.
    struct ExplodingHook;

    impl TickStage for ExplodingHook {
        fn kind(&self) -> StageKind {
            StageKind::BlockEntity
        }

        #[allow(clippy::panic)]
        fn pre_tick(&mut self) {
            panic!("block entity failed to load");
        }
    }

    #[test]
    fn completed_work_pops_the_stage() {
        let mut tree = tree();
        let id = root(&mut tree);
        let outcome = tree.with_stage(id, |tree| {
            assert_eq!(tree.active_stage(), Some(id));
            Ok::<(), String>(())
        });
        assert_eq!(outcome.ok(), Some(StageOutcome::Completed));
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.history(), &[id]);
        assert_eq!(tree.work_failure_count(), 0);
    }

    #[test]
    fn failing_work_is_popped_logged_and_suppressed() {
        let mut tree = tree();
        let id = root(&mut tree);
        let outcome = tree.with_stage(id, |tree| {
            tree.run_stage(MarkerStage::new(StageKind::World, "overworld"), |_| {
                Err("chunk missing")
            })
            .map(|_| ())
        });

        // The inner failure is suppressed; the outer work completes.
        assert_eq!(outcome.ok(), Some(StageOutcome::Completed));
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.history().len(), 2);
        assert_eq!(tree.work_failure_count(), 1);

        let failure = tree.last_work_failure();
        assert_eq!(failure.map(|f| f.message.as_str()), Some("chunk missing"));
        assert_eq!(failure.map(|f| f.stage.label.as_str()), Some("overworld"));
        assert_eq!(failure.map(|f| f.active_stack.len()), Some(2));
        assert_eq!(failure.map(|f| f.panicked), Some(false));
    }

    #[test]
    #[allow(clippy::panic)]
    fn panicking_work_is_still_popped() {
        let mut tree = tree();
        let id = root(&mut tree);
        let outcome = tree.with_stage(id, |_| -> Result<(), String> {
            panic!("scheduled tick exploded")
        });

        assert!(outcome.as_ref().is_ok_and(StageOutcome::is_suppressed));
        assert_eq!(tree.depth(), 0);
        let failure = tree.last_work_failure();
        assert_eq!(failure.map(|f| f.panicked), Some(true));
        assert_eq!(
            failure.map(|f| f.message.as_str()),
            Some("scheduled tick exploded")
        );
    }

    #[test]
    fn panicking_pre_tick_is_handled_like_failing_work() {
        let mut tree = tree();
        let parent = root(&mut tree);
        tree.push(parent).unwrap();
        let id = tree.register_child(ExplodingHook).unwrap();

        let mut ran = false;
        let outcome = tree.with_stage(id, |_| {
            ran = true;
            Ok::<(), String>(())
        });

        assert!(outcome.unwrap().is_suppressed());
        assert!(!ran);
        assert_eq!(tree.active_stages(), &[parent]);
        assert_eq!(tree.history(), &[id]);
        let failure = tree.last_work_failure().unwrap();
        assert!(failure.panicked);
        assert_eq!(failure.message, "block entity failed to load");
        assert_eq!(failure.active_stack.len(), 2);
    }

    #[test]
    fn panicking_root_hook_still_ends_the_tick() {
        let mut tree = tree().with_work_error_policy(WorkErrorPolicy::Propagate);
        let outcome = tree.run_tick(ExplodingHook, |_| Ok::<(), String>(()));

        assert!(matches!(outcome, Err(TreeError::WorkFailed(ref f)) if f.panicked));
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.history().len(), 1);
    }

    #[test]
    fn propagate_policy_returns_the_failure_after_popping() {
        let mut tree = tree().with_work_error_policy(WorkErrorPolicy::Propagate);
        let id = root(&mut tree);
        let outcome = tree.with_stage(id, |_| Err("boom"));

        assert!(matches!(outcome, Err(TreeError::WorkFailed(ref f)) if f.message == "boom"));
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.work_failure_count(), 1);
    }

    #[test]
    fn rejected_push_runs_no_work_and_pops_nothing() {
        let mut tree = tree();
        let a = root(&mut tree);
        let b = root(&mut tree);
        assert!(tree.push(a).is_ok());

        let mut ran = false;
        let outcome = tree.with_stage(b, |_| {
            ran = true;
            Ok::<(), String>(())
        });
        assert!(matches!(outcome, Err(TreeError::StackDisciplineViolation(_))));
        assert!(!ran);
        assert_eq!(tree.active_stages(), &[a]);
    }

    #[test]
    fn stages_left_open_by_work_are_unwound() {
        let mut tree = tree();
        let id = root(&mut tree);
        let outcome = tree.with_stage(id, |tree| {
            let leaked = tree.register_child(MarkerStage::new(StageKind::Entity, "zombie"))?;
            tree.push(leaked)
        });
        assert_eq!(outcome.ok(), Some(StageOutcome::Completed));
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.history().len(), 2);
    }
}
