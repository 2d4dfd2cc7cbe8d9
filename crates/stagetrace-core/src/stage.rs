//! Tick stages and the arena that owns them.
//!
//! The host hands stages to the tree as boxed [`TickStage`] objects. The
//! tree stores them in a [`StageArena`] together with their structural
//! links: a non-owning parent handle fixed at registration, and the ordered
//! handles of the children that were pushed under them.

use stagetrace_types::{StageId, StageKind, StageSummary};

use crate::error::TreeError;

/// A unit of simulated work bracketed by the stage tree.
pub trait TickStage: Send {
    /// Category of this stage.
    fn kind(&self) -> StageKind;

    /// Human-readable label for logs and pause reports.
    fn label(&self) -> String {
        self.kind().to_string()
    }

    /// Called once the stage is on the stack and any pending pause resolved.
    fn pre_tick(&mut self) {}

    /// Called right after the stage leaves the stack.
    fn post_tick(&mut self) {}
}

/// A stage with no hooks, identified only by kind and label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerStage {
    kind: StageKind,
    label: String,
}

impl MarkerStage {
    /// Create a hookless stage.
    pub fn new(kind: StageKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
        }
    }

    /// The outermost stage of a server tick.
    pub fn server_root() -> Self {
        Self::new(StageKind::ServerRoot, "server")
    }
}

impl TickStage for MarkerStage {
    fn kind(&self) -> StageKind {
        self.kind.clone()
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

/// Arena record of a registered stage.
pub(crate) struct StageNode {
    pub(crate) kind: StageKind,
    pub(crate) label: String,
    pub(crate) parent: Option<StageId>,
    pub(crate) children: Vec<StageId>,
    pub(crate) depth: usize,
    pub(crate) stage: Box<dyn TickStage>,
}

impl StageNode {
    pub(crate) fn summary(&self, id: StageId) -> StageSummary {
        StageSummary {
            id,
            kind: self.kind.clone(),
            label: self.label.clone(),
            depth: self.depth,
        }
    }
}

/// Stable-handle storage for stages.
///
/// Handles stay valid until [`reset`](Self::reset), which starts a new epoch.
#[derive(Default)]
pub(crate) struct StageArena {
    nodes: Vec<StageNode>,
    epoch: u32,
}

impl StageArena {
    pub(crate) fn insert(
        &mut self,
        parent: Option<StageId>,
        stage: Box<dyn TickStage>,
    ) -> Result<StageId, TreeError> {
        let index = u32::try_from(self.nodes.len()).map_err(|_overflow| TreeError::ArenaExhausted)?;
        let depth = match parent {
            Some(parent) => self
                .get(parent)
                .ok_or(TreeError::UnknownStage(parent))?
                .depth
                .saturating_add(1),
            None => 0,
        };
        self.nodes.push(StageNode {
            kind: stage.kind(),
            label: stage.label(),
            parent,
            children: Vec::new(),
            depth,
            stage,
        });
        Ok(StageId::from_parts(index, self.epoch))
    }

    pub(crate) fn get(&self, id: StageId) -> Option<&StageNode> {
        if id.epoch() != self.epoch {
            return None;
        }
        self.nodes.get(usize::try_from(id.index()).ok()?)
    }

    pub(crate) fn get_mut(&mut self, id: StageId) -> Option<&mut StageNode> {
        if id.epoch() != self.epoch {
            return None;
        }
        self.nodes.get_mut(usize::try_from(id.index()).ok()?)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Drop every stage and invalidate all issued handles.
    pub(crate) fn reset(&mut self) {
        self.nodes.clear();
        self.epoch = self.epoch.wrapping_add(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn marker(kind: StageKind) -> Box<dyn TickStage> {
        Box::new(MarkerStage::new(kind, "test"))
    }

    #[test]
    fn insert_records_parent_and_depth() {
        let mut arena = StageArena::default();
        let root = arena.insert(None, marker(StageKind::ServerRoot)).unwrap();

        let world = arena.insert(Some(root), marker(StageKind::World)).unwrap();

        assert_eq!(arena.get(world).and_then(|n| n.parent), Some(root));
        assert_eq!(arena.get(world).map(|n| n.depth), Some(1));
        assert_eq!(arena.get(root).map(|n| n.depth), Some(0));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut arena = StageArena::default();
        let ghost = StageId::from_parts(9, 0);
        let result = arena.insert(Some(ghost), marker(StageKind::World));
        assert!(matches!(result, Err(TreeError::UnknownStage(id)) if id == ghost));
    }

    #[test]
    fn reset_invalidates_old_handles() {
        let mut arena = StageArena::default();
        let old = arena
            .insert(None, marker(StageKind::ServerRoot))
            .unwrap();
        arena.reset();
        let new = arena
            .insert(None, marker(StageKind::ServerRoot))
            .unwrap();

        assert_eq!(old.index(), new.index());
        assert!(arena.get(old).is_none());
        assert!(arena.get(new).is_some());
    }

    #[test]
    fn marker_label_defaults() {
        let stage = MarkerStage::server_root();
        assert_eq!(stage.kind(), StageKind::ServerRoot);
        assert_eq!(stage.label(), "server");
    }
}
