//! Identifier types.
//!
//! Stages live in an arena owned by the stage tree, so a [`StageId`] is an
//! index paired with the arena epoch it was issued in. Clearing the tree
//! starts a new epoch, which turns every older handle stale instead of
//! letting it alias a newly registered stage.
//!
//! Breakpoints are numbered by whoever configures them and use a plain
//! numeric [`BreakpointId`].

use serde::{Deserialize, Serialize};

/// Handle to a stage in the stage tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StageId {
    index: u32,
    epoch: u32,
}

impl StageId {
    /// Build a handle from its raw parts.
    pub const fn from_parts(index: u32, epoch: u32) -> Self {
        Self { index, epoch }
    }

    /// Position of the stage inside its arena.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Arena epoch this handle was issued in.
    pub const fn epoch(self) -> u32 {
        self.epoch
    }
}

impl core::fmt::Display for StageId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.index, self.epoch)
    }
}

/// Numeric identifier of a configured breakpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BreakpointId(pub u32);

impl BreakpointId {
    /// Return the raw numeric value.
    pub const fn into_inner(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for BreakpointId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}
