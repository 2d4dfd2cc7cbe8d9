//! Error types for the `stagetrace-core` crate.
//!
//! Every stage tree operation returns [`TreeError`] on failure. Thread
//! affinity and stack discipline violations are caller bugs: the operation is
//! aborted and the error is meant to be propagated, not retried.

use std::thread::ThreadId;

use stagetrace_types::{StageId, StageKind, StageSummary};

/// Errors raised by the stage tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A tree-mutating call happened off the designated simulation thread.
    #[error("stage tree called off thread: owner {owner:?}, caller {caller:?}")]
    ThreadAffinityViolation {
        /// Thread the tree is bound to.
        owner: ThreadId,
        /// Thread that made the call.
        caller: ThreadId,
    },

    /// A push or an expecting pop broke the parent/child stack discipline.
    #[error("stack discipline violation: {0}")]
    StackDisciplineViolation(Box<StackViolation>),

    /// `pop` was called with no active stage.
    #[error("pop called on an empty stage stack")]
    EmptyStack,

    /// The handle does not name a stage in the current arena epoch.
    #[error("unknown stage {0}")]
    UnknownStage(StageId),

    /// The arena cannot issue more handles in this epoch.
    #[error("stage arena exhausted")]
    ArenaExhausted,

    /// Stage work failed and the tree is configured to propagate failures.
    #[error("{0}")]
    WorkFailed(Box<SuppressedWorkError>),

    /// Stages were still active when the tick boundary was reached.
    #[error("{} stage(s) still active after the tick ended", .remaining.len())]
    NotEmptyAfterTick {
        /// The stages left on the stack, root first.
        remaining: Vec<StageSummary>,
    },
}

/// Detail of a [`TreeError::StackDisciplineViolation`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackViolation {
    /// The pushed stage's parent is not the current top of the stack.
    #[error("stage {stage} is not a child of {}", describe(.top.as_ref()))]
    NotChildOfTop {
        /// The stage being pushed.
        stage: StageSummary,
        /// The parent recorded on the stage.
        parent: Option<StageSummary>,
        /// The current top of the active stack.
        top: Option<StageSummary>,
    },

    /// The popped stage is not of the kind the caller expected.
    #[error("popped stage {popped} but expected a {expected} stage")]
    UnexpectedKind {
        /// The stage that was popped.
        popped: StageSummary,
        /// The kind the caller expected.
        expected: StageKind,
    },
}

fn describe(stage: Option<&StageSummary>) -> String {
    stage.map_or_else(|| "<root>".to_owned(), ToString::to_string)
}

/// A failure raised by work running inside a scoped stage.
///
/// Under the default policy this is logged and handed back as
/// [`StageOutcome::Suppressed`](crate::StageOutcome::Suppressed); the
/// simulation carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("work in stage {stage} failed: {message}")]
pub struct SuppressedWorkError {
    /// The stage whose work failed.
    pub stage: StageSummary,
    /// The error message, or the panic payload for panicking work.
    pub message: String,
    /// Whether the work panicked rather than returning an error.
    pub panicked: bool,
    /// The active stack at the point of failure, root first.
    pub active_stack: Vec<StageSummary>,
}
