//! Built-in breakpoint kinds.
//!
//! - [`BlockUpdateKind`] (`block_update`) fires on every block update,
//!   optionally restricted to one world.
//! - [`BlockUpdatedKind`] (`block_updated`) wraps `block_update` with a
//!   position filter: it checks the target position first and then defers to
//!   the wrapped kind's chain.
//! - [`BlockChangedKind`] (`block_changed`) fires when a block state is
//!   written at a configured position.

use std::sync::Arc;

use stagetrace_types::{BreakpointId, EventTag};

use crate::breakpoint::Breakpoint;
use crate::fields::{FieldContainer, FieldDescriptor, FieldValue};
use crate::kind::BreakpointKind;
use crate::matcher::{MatchChain, PositionFilter, RequireEvent, WorldFilter};

fn world_field(container: &mut dyn FieldContainer, breakpoint: &Breakpoint) {
    container.add_field(FieldDescriptor {
        key: "world",
        label: "World",
        value: FieldValue::Text(breakpoint.fields.world.clone()),
    });
}

fn pos_field(container: &mut dyn FieldContainer, breakpoint: &Breakpoint) {
    container.add_field(FieldDescriptor {
        key: "pos",
        label: "Position",
        value: FieldValue::Position(breakpoint.fields.pos),
    });
}

// ---------------------------------------------------------------------------
// block_update
// ---------------------------------------------------------------------------

/// Fires on any block update in the configured world (or any world).
#[derive(Debug, Clone)]
pub struct BlockUpdateKind {
    chain: MatchChain,
}

impl BlockUpdateKind {
    /// Stable identifier.
    pub const ID: &'static str = "block_update";

    /// Create the kind with its default chain.
    pub fn new() -> Self {
        Self {
            chain: MatchChain::new()
                .then(RequireEvent(EventTag::BlockUpdate))
                .then(WorldFilter),
        }
    }
}

impl Default for BlockUpdateKind {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakpointKind for BlockUpdateKind {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn description(&self) -> &'static str {
        "Break on any block update"
    }

    fn create(self: Arc<Self>, id: BreakpointId) -> Breakpoint {
        Breakpoint::new(id, self)
    }

    fn append_fields(&self, container: &mut dyn FieldContainer, breakpoint: &Breakpoint) {
        world_field(container, breakpoint);
    }

    fn accepts(&self, tag: EventTag) -> bool {
        tag == EventTag::BlockUpdate
    }

    fn matcher(&self) -> &MatchChain {
        &self.chain
    }
}

// ---------------------------------------------------------------------------
// block_updated
// ---------------------------------------------------------------------------

/// Fires on a block update targeting the configured position.
///
/// Built on top of a base kind: the position check runs first and the base
/// kind's chain decides the rest. Fields are the base kind's plus a position.
#[derive(Debug, Clone)]
pub struct BlockUpdatedKind {
    base: BlockUpdateKind,
    chain: MatchChain,
}

impl BlockUpdatedKind {
    /// Stable identifier.
    pub const ID: &'static str = "block_updated";

    /// Wrap `base` with a position filter.
    pub fn new(base: BlockUpdateKind) -> Self {
        let chain = MatchChain::new()
            .then(PositionFilter)
            .then(base.matcher().clone());
        Self { base, chain }
    }
}

impl Default for BlockUpdatedKind {
    fn default() -> Self {
        Self::new(BlockUpdateKind::new())
    }
}

impl BreakpointKind for BlockUpdatedKind {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn description(&self) -> &'static str {
        "Break when the block at a position is updated"
    }

    fn create(self: Arc<Self>, id: BreakpointId) -> Breakpoint {
        Breakpoint::new(id, self)
    }

    fn append_fields(&self, container: &mut dyn FieldContainer, breakpoint: &Breakpoint) {
        pos_field(container, breakpoint);
        self.base.append_fields(container, breakpoint);
    }

    fn accepts(&self, tag: EventTag) -> bool {
        self.base.accepts(tag)
    }

    fn matcher(&self) -> &MatchChain {
        &self.chain
    }
}

// ---------------------------------------------------------------------------
// block_changed
// ---------------------------------------------------------------------------

/// Fires when a block state is written at the configured position.
#[derive(Debug, Clone)]
pub struct BlockChangedKind {
    chain: MatchChain,
}

impl BlockChangedKind {
    /// Stable identifier.
    pub const ID: &'static str = "block_changed";

    /// Create the kind with its default chain.
    pub fn new() -> Self {
        Self {
            chain: MatchChain::new()
                .then(RequireEvent(EventTag::BlockChanged))
                .then(PositionFilter)
                .then(WorldFilter),
        }
    }
}

impl Default for BlockChangedKind {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakpointKind for BlockChangedKind {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn description(&self) -> &'static str {
        "Break when the block state at a position changes"
    }

    fn create(self: Arc<Self>, id: BreakpointId) -> Breakpoint {
        Breakpoint::new(id, self)
    }

    fn append_fields(&self, container: &mut dyn FieldContainer, breakpoint: &Breakpoint) {
        pos_field(container, breakpoint);
        world_field(container, breakpoint);
    }

    fn accepts(&self, tag: EventTag) -> bool {
        tag == EventTag::BlockChanged
    }

    fn matcher(&self) -> &MatchChain {
        &self.chain
    }
}
