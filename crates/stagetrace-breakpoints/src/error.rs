//! Error types for the `stagetrace-breakpoints` crate.

use stagetrace_core::TreeError;
use stagetrace_types::{BreakpointId, EventTag};

/// A breakpoint was offered an event it cannot interpret.
///
/// This is a configuration or programming error, distinct from an event that
/// simply does not match.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BreakpointMatchError {
    /// The breakpoint's kind does not understand this event shape.
    #[error("breakpoint {breakpoint} of kind `{kind}` cannot interpret {tag} events")]
    UnsupportedEvent {
        /// The breakpoint that was called.
        breakpoint: BreakpointId,
        /// Its kind identifier.
        kind: &'static str,
        /// Tag of the offered event.
        tag: EventTag,
    },
}

/// Errors from kind registration and breakpoint bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No kind is registered under this identifier.
    #[error("unknown breakpoint kind `{0}`")]
    UnknownKind(String),

    /// A kind with this identifier is already registered.
    #[error("breakpoint kind `{0}` is already registered")]
    DuplicateKind(&'static str),

    /// No breakpoint has this identifier.
    #[error("unknown breakpoint {0}")]
    UnknownBreakpoint(BreakpointId),

    /// Every breakpoint identifier is taken.
    #[error("breakpoint identifiers exhausted")]
    IdsExhausted,
}

/// Errors from dispatching an event into the stage tree.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A breakpoint could not interpret the event.
    #[error("match error: {source}")]
    Match {
        /// The underlying match error.
        #[from]
        source: BreakpointMatchError,
    },

    /// Freezing through the stage tree failed.
    #[error("tree error: {source}")]
    Tree {
        /// The underlying tree error.
        #[from]
        source: TreeError,
    },
}
