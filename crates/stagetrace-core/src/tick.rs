//! Tick boundaries.
//!
//! Every server tick starts with a fresh tree rooted in a single stage and
//! must end with that root popped and nothing else left active. The host
//! calls [`StageTree::begin_tick`] and [`StageTree::end_tick`] around its
//! tick, or hands the whole tick to [`StageTree::run_tick`].

use stagetrace_types::{StageId, StageKind};
use tracing::{debug, error};

use crate::error::TreeError;
use crate::scope::StageOutcome;
use crate::stage::TickStage;
use crate::tree::StageTree;

impl StageTree {
    /// Start a tick: reset the tree and push `root`.
    ///
    /// Stages still active from an earlier tick mean that tick never reached
    /// its end; they are logged and the tree is hard-reset with
    /// [`clear`](Self::clear). Otherwise only the history and the arena are
    /// dropped: a pending step-into carries over into the new tick, while a
    /// pending step-over is cancelled because its target no longer exists.
    pub fn begin_tick(&mut self, root: impl TickStage + 'static) -> Result<StageId, TreeError> {
        let id = self.start_tick(root)?;
        self.run_pre_tick(id)?;
        Ok(id)
    }

    /// Reset the tree and enter `root` without running its hooks.
    fn start_tick(&mut self, root: impl TickStage + 'static) -> Result<StageId, TreeError> {
        self.check_on_thread()?;
        self.real_ticks = self.real_ticks.saturating_add(1);

        if self.active.is_empty() {
            self.history.clear();
            self.arena.reset();
            if self.ctx.cancel_step_over() {
                debug!("Dropped step-over targeting the previous tick");
            }
        } else {
            error!(stages = ?self.stack_snapshot(), "Tree is not empty at tick start");
            self.clear()?;
        }

        let id = self.register(None, root)?;
        self.enter(id)?;
        debug!(tick = self.real_ticks, root = %id, "Tick started");
        Ok(id)
    }

    /// End a tick: pop the root, expecting `root_kind`, and check the stack
    /// is empty.
    pub fn end_tick(&mut self, root_kind: &StageKind) -> Result<StageId, TreeError> {
        let id = self.pop_expecting(root_kind)?;
        if !self.active.is_empty() {
            let remaining = self.stack_snapshot();
            error!(stages = ?remaining, "Tree is not empty after popping the root");
            return Err(TreeError::NotEmptyAfterTick { remaining });
        }
        debug!(tick = self.real_ticks, "Tick ended");
        Ok(id)
    }

    /// Run one tick: [`begin_tick`](Self::begin_tick), scoped `work`, then
    /// [`end_tick`](Self::end_tick).
    ///
    /// Work failures follow the same policy as
    /// [`with_stage`](Self::with_stage), and the root's `pre_tick` hook runs
    /// under the same policy. Stages the work left open above the root are
    /// popped before the root.
    pub fn run_tick<E, F>(
        &mut self,
        root: impl TickStage + 'static,
        work: F,
    ) -> Result<StageOutcome, TreeError>
    where
        E: core::fmt::Display,
        F: FnOnce(&mut Self) -> Result<(), E>,
    {
        let root_kind = root.kind();
        let id = self.start_tick(root)?;
        let failure = self.run_work(id, work);
        while self.active_stage().is_some_and(|top| top != id) {
            self.pop()?;
        }
        self.end_tick(&root_kind)?;
        self.settle(failure)
    }
}
