//! Enumeration types for stages and events.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Stage Kinds
// ---------------------------------------------------------------------------

/// Category of a tick stage.
///
/// The per-stage work belongs to the host; the debugger only needs the kind
/// to decide whether a stage may trigger a step-into pause and to check
/// expectations when the host pops a stage it believes it pushed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// The outermost stage of one server tick.
    ServerRoot,
    /// Ticking of a single world (dimension).
    World,
    /// Bookkeeping stage that hands a world to queued work.
    WorldProvider,
    /// Delivery of a queued network packet.
    NetworkPacket,
    /// A block update being processed.
    BlockUpdate,
    /// A neighbor update spreading from a changed block.
    NeighborUpdate,
    /// A scheduled block or fluid tick.
    ScheduledTick,
    /// A block entity tick.
    BlockEntity,
    /// An entity tick.
    Entity,
    /// Host-defined stage kind not known to the debugger.
    Custom(String),
}

impl StageKind {
    /// Whether this kind is exempt from triggering step-into pauses.
    ///
    /// Providers are packet-delivery and hand-off bookkeeping rather than
    /// meaningful simulation work.
    pub const fn is_provider(&self) -> bool {
        matches!(self, Self::WorldProvider | Self::NetworkPacket)
    }
}

impl core::fmt::Display for StageKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ServerRoot => f.write_str("server_root"),
            Self::World => f.write_str("world"),
            Self::WorldProvider => f.write_str("world_provider"),
            Self::NetworkPacket => f.write_str("network_packet"),
            Self::BlockUpdate => f.write_str("block_update"),
            Self::NeighborUpdate => f.write_str("neighbor_update"),
            Self::ScheduledTick => f.write_str("scheduled_tick"),
            Self::BlockEntity => f.write_str("block_entity"),
            Self::Entity => f.write_str("entity"),
            Self::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Event Tags
// ---------------------------------------------------------------------------

/// Shape tag of a [`RuntimeEvent`](crate::RuntimeEvent).
///
/// Breakpoint kinds declare which tags they can interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTag {
    /// A block received an update.
    BlockUpdate,
    /// A block state was written into a chunk.
    BlockChanged,
}

impl core::fmt::Display for EventTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BlockUpdate => f.write_str("block_update"),
            Self::BlockChanged => f.write_str("block_changed"),
        }
    }
}
