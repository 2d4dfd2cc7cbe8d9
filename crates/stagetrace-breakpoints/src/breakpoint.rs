//! Breakpoint instances.

use std::sync::Arc;

use stagetrace_types::{BlockPos, BreakpointId, BreakpointSpec, RuntimeEvent};

use crate::error::BreakpointMatchError;
use crate::kind::BreakpointKind;

/// User-configured fields of a breakpoint. Which of them a kind reads is up
/// to its matcher chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakpointFields {
    /// Target block position.
    pub pos: Option<BlockPos>,
    /// Target world.
    pub world: Option<String>,
}

/// One breakpoint: an identifier, the kind it was created from, and its
/// configuration.
#[derive(Clone)]
pub struct Breakpoint {
    id: BreakpointId,
    kind: Arc<dyn BreakpointKind>,
    /// Whether the breakpoint participates in matching.
    pub enabled: bool,
    /// Configured fields.
    pub fields: BreakpointFields,
}

impl Breakpoint {
    /// A new enabled breakpoint with empty fields.
    pub fn new(id: BreakpointId, kind: Arc<dyn BreakpointKind>) -> Self {
        Self {
            id,
            kind,
            enabled: true,
            fields: BreakpointFields::default(),
        }
    }

    /// Identifier.
    pub const fn id(&self) -> BreakpointId {
        self.id
    }

    /// The kind this breakpoint was created from.
    pub const fn kind(&self) -> &Arc<dyn BreakpointKind> {
        &self.kind
    }

    /// Offer `event` to this breakpoint.
    ///
    /// Returns `Ok(true)` if it fires and `Ok(false)` if the event does not
    /// match. An event shape the kind cannot interpret is an error, never a
    /// silent non-match.
    pub fn call(&self, event: &RuntimeEvent) -> Result<bool, BreakpointMatchError> {
        let tag = event.tag();
        if !self.kind.accepts(tag) {
            return Err(BreakpointMatchError::UnsupportedEvent {
                breakpoint: self.id,
                kind: self.kind.id(),
                tag,
            });
        }
        self.kind.matcher().evaluate(self, event)
    }

    /// Serializable record of this breakpoint.
    pub fn to_spec(&self) -> BreakpointSpec {
        BreakpointSpec {
            id: self.id,
            kind: self.kind.id().to_owned(),
            enabled: self.enabled,
            pos: self.fields.pos,
            world: self.fields.world.clone(),
        }
    }
}

impl core::fmt::Debug for Breakpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Breakpoint")
            .field("id", &self.id)
            .field("kind", &self.kind.id())
            .field("enabled", &self.enabled)
            .field("fields", &self.fields)
            .finish()
    }
}

impl core::fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.id, self.kind.id())?;
        if let Some(pos) = self.fields.pos {
            write!(f, " at {pos}")?;
        }
        if let Some(world) = &self.fields.world {
            write!(f, " in {world}")?;
        }
        if !self.enabled {
            write!(f, " (disabled)")?;
        }
        Ok(())
    }
}
