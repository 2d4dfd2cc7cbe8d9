//! The breakpoint kind contract.

use std::sync::Arc;

use stagetrace_types::{BreakpointId, EventTag};

use crate::breakpoint::Breakpoint;
use crate::fields::FieldContainer;
use crate::matcher::MatchChain;

/// A category of breakpoint.
///
/// A kind names itself, creates instances, describes its configurable fields
/// and owns the matcher chain its instances run. Kinds are shared between
/// threads through `Arc<dyn BreakpointKind>`.
pub trait BreakpointKind: Send + Sync {
    /// Stable identifier, used in configuration and on the command line.
    fn id(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// Create a new instance of this kind.
    fn create(self: Arc<Self>, id: BreakpointId) -> Breakpoint;

    /// Describe the fields a UI should offer for `breakpoint`.
    fn append_fields(&self, container: &mut dyn FieldContainer, breakpoint: &Breakpoint);

    /// Whether instances can interpret events with this tag.
    fn accepts(&self, tag: EventTag) -> bool;

    /// Matching logic run by every instance.
    fn matcher(&self) -> &MatchChain;
}
