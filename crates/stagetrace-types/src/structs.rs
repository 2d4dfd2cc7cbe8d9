//! Stage summaries and persisted breakpoint records.

use serde::{Deserialize, Serialize};

use crate::enums::StageKind;
use crate::events::BlockPos;
use crate::ids::{BreakpointId, StageId};

/// Snapshot of one stage, detached from the tree that owns it.
///
/// Used in diagnostics, pause reports and the controller's stack view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    /// Arena handle of the stage.
    pub id: StageId,
    /// Stage kind.
    pub kind: StageKind,
    /// Human-readable label supplied by the host.
    pub label: String,
    /// Depth in the active stack (0 = root), or the depth it had when popped.
    pub depth: usize,
}

impl core::fmt::Display for StageSummary {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}] {} {} ({})", self.depth, self.kind, self.label, self.id)
    }
}

/// Serializable breakpoint configuration.
///
/// Storage is owned by whoever persists breakpoints; this is the record they
/// round-trip through the breakpoint manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointSpec {
    /// Breakpoint identifier.
    pub id: BreakpointId,
    /// Stable identifier of the breakpoint kind (e.g. `block_updated`).
    pub kind: String,
    /// Whether the breakpoint participates in matching.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Configured target position, for kinds that filter by position.
    #[serde(default)]
    pub pos: Option<BlockPos>,
    /// Configured world, for kinds that filter by world.
    #[serde(default)]
    pub world: Option<String>,
}

const fn default_true() -> bool {
    true
}
