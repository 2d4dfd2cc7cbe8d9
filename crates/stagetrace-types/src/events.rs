//! Runtime events offered to breakpoints.
//!
//! Events form a closed tagged enum. A breakpoint kind inspects the
//! [`EventTag`] to decide whether it can interpret an event at all, which
//! replaces an unchecked runtime cast with an explicit "unsupported" outcome.

use serde::{Deserialize, Serialize};

use crate::enums::EventTag;

/// Integer block coordinates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct BlockPos {
    /// East/west coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// North/south coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Create a position from its coordinates.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl core::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Why a block update happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateCause {
    /// A neighboring block changed.
    Neighbor,
    /// A comparator or observer style state update.
    StateUpdate,
    /// A scheduled tick fired.
    Scheduled,
}

/// A block at `target_pos` is being updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockUpdateEvent {
    /// World the update happens in.
    pub world: String,
    /// Block receiving the update.
    pub target_pos: BlockPos,
    /// Block that caused the update, if any.
    pub source_pos: Option<BlockPos>,
    /// Kind of update.
    pub cause: UpdateCause,
}

/// A block state is being written at `pos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockChangedEvent {
    /// World the change happens in.
    pub world: String,
    /// Position of the changed block.
    pub pos: BlockPos,
    /// State before the write.
    pub old_state: String,
    /// State being written.
    pub new_state: String,
}

/// An event raised by the host while a stage is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    /// See [`BlockUpdateEvent`].
    BlockUpdate(BlockUpdateEvent),
    /// See [`BlockChangedEvent`].
    BlockChanged(BlockChangedEvent),
}

impl RuntimeEvent {
    /// Shape tag of this event.
    pub const fn tag(&self) -> EventTag {
        match self {
            Self::BlockUpdate(_) => EventTag::BlockUpdate,
            Self::BlockChanged(_) => EventTag::BlockChanged,
        }
    }

    /// Position the event is about.
    pub const fn target_pos(&self) -> BlockPos {
        match self {
            Self::BlockUpdate(event) => event.target_pos,
            Self::BlockChanged(event) => event.pos,
        }
    }

    /// World the event happens in.
    pub fn world(&self) -> &str {
        match self {
            Self::BlockUpdate(event) => &event.world,
            Self::BlockChanged(event) => &event.world,
        }
    }
}
