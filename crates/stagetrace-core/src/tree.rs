//! The stage tree: active stack, history and stepping state machine.
//!
//! [`StageTree`] is bound to the thread that created it. Every call that
//! mutates the stack checks the calling thread and fails with
//! [`TreeError::ThreadAffinityViolation`] off-thread, because the
//! parent/child invariants are not safe under concurrent mutation.
//!
//! # Stack discipline
//!
//! A stage may only be pushed while its parent is the top of the active
//! stack (or, for a root stage, while the stack is empty). Together with the
//! append-only history this means `history` plus the active stack always
//! reconstruct a tree consistent with the real nesting of the work.
//!
//! # Pausing
//!
//! Pausing never blocks the thread. The tree freezes the shared
//! [`DebugContext`] and then calls the host's [`Pump`] in a loop until the
//! context is unfrozen or the host stops. The pump is what delivers the
//! controller commands that end the pause.

use std::sync::Arc;
use std::thread::ThreadId;

use stagetrace_types::{StageId, StageKind, StageSummary};
use tracing::{debug, error, info};

use crate::config::WorkErrorPolicy;
use crate::context::{DebugContext, Pump, StepCallback};
use crate::error::{StackViolation, SuppressedWorkError, TreeError};
use crate::stage::{StageArena, StageNode, TickStage};

/// Active-stage stack, completed-stage history and stepping control.
pub struct StageTree {
    /// Registered stages.
    pub(crate) arena: StageArena,
    /// Active stack, root first.
    pub(crate) active: Vec<StageId>,
    /// Popped stages in pop order.
    pub(crate) history: Vec<StageId>,
    /// The designated simulation thread.
    owner: ThreadId,
    /// Shared freeze and stepping state.
    pub(crate) ctx: Arc<DebugContext>,
    /// Input pump driven while frozen.
    pump: Box<dyn Pump>,
    /// Failure policy for scoped work.
    pub(crate) work_errors: WorkErrorPolicy,
    /// Number of failed scoped work units.
    pub(crate) work_failures: u64,
    /// Most recent scoped work failure.
    pub(crate) last_work_failure: Option<SuppressedWorkError>,
    /// Number of tick boundaries crossed.
    pub(crate) real_ticks: u64,
}

impl core::fmt::Debug for StageTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StageTree")
            .field("active", &self.active)
            .field("history_len", &self.history.len())
            .field("owner", &self.owner)
            .field("ctx", &self.ctx)
            .field("work_errors", &self.work_errors)
            .field("work_failures", &self.work_failures)
            .finish_non_exhaustive()
    }
}

impl StageTree {
    /// Create an empty tree bound to the calling thread.
    pub fn new(ctx: Arc<DebugContext>, pump: impl Pump + 'static) -> Self {
        Self {
            arena: StageArena::default(),
            active: Vec::new(),
            history: Vec::new(),
            owner: std::thread::current().id(),
            ctx,
            pump: Box::new(pump),
            work_errors: WorkErrorPolicy::default(),
            work_failures: 0,
            last_work_failure: None,
            real_ticks: 0,
        }
    }

    /// Set how scoped work failures are handled.
    #[must_use]
    pub fn with_work_error_policy(mut self, policy: WorkErrorPolicy) -> Self {
        self.work_errors = policy;
        self
    }

    /// The shared context this tree freezes and steps through.
    pub const fn context(&self) -> &Arc<DebugContext> {
        &self.ctx
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a stage under `parent` without pushing it.
    ///
    /// The parent is fixed for the lifetime of the stage.
    pub fn register(
        &mut self,
        parent: Option<StageId>,
        stage: impl TickStage + 'static,
    ) -> Result<StageId, TreeError> {
        self.check_on_thread()?;
        self.arena.insert(parent, Box::new(stage))
    }

    /// Register a stage whose parent is the current top of the stack.
    pub fn register_child(&mut self, stage: impl TickStage + 'static) -> Result<StageId, TreeError> {
        let parent = self.active_stage();
        self.register(parent, stage)
    }

    // -----------------------------------------------------------------------
    // Push / Pop
    // -----------------------------------------------------------------------

    /// Push a registered stage onto the active stack.
    ///
    /// If a step-into is pending and the stage is not a provider, the
    /// request is consumed and the simulation pauses here before
    /// [`TickStage::pre_tick`] runs.
    pub fn push(&mut self, id: StageId) -> Result<(), TreeError> {
        self.enter(id)?;
        self.run_pre_tick(id)
    }

    /// Validate and push `id`, pausing for a pending step-into. Does not run
    /// the stage's hooks.
    pub(crate) fn enter(&mut self, id: StageId) -> Result<(), TreeError> {
        self.check_on_thread()?;
        let top = self.active_stage();
        let node = self.node(id)?;
        if node.parent != top {
            let violation = StackViolation::NotChildOfTop {
                stage: node.summary(id),
                parent: node.parent.and_then(|parent| self.summary(parent)),
                top: top.and_then(|top| self.summary(top)),
            };
            error!(%violation, "Rejected stage push");
            return Err(TreeError::StackDisciplineViolation(Box::new(violation)));
        }
        let provider = node.kind.is_provider();

        if self.active.contains(&id) {
            error!(stage = %id, "Stage is already active");
        }
        if let Some(parent) = top {
            self.node_mut(parent)?.children.push(id);
        }
        let depth = self.active.len();
        self.node_mut(id)?.depth = depth;
        self.active.push(id);
        debug!(depth, stage = %id, "Stage pushed");

        // Packet delivery and world hand-off must not consume a step-into.
        if !provider {
            if let Some(callback) = self.ctx.take_step_into() {
                callback();
                debug!(stage = %id, "Step into");
                self.wait_while_frozen("step-into");
            }
        }
        Ok(())
    }

    /// Run the `pre_tick` hook of an entered stage.
    pub(crate) fn run_pre_tick(&mut self, id: StageId) -> Result<(), TreeError> {
        debug!(stage = %id, "preTick");
        self.node_mut(id)?.stage.pre_tick();
        Ok(())
    }

    /// Pop the top of the active stack into history.
    ///
    /// If the popped stage is the pending step-over target, the request is
    /// consumed and the simulation pauses after [`TickStage::post_tick`].
    pub fn pop(&mut self) -> Result<StageId, TreeError> {
        self.check_on_thread()?;
        let id = self.active.pop().ok_or(TreeError::EmptyStack)?;
        self.history.push(id);
        debug!(depth = self.active.len(), stage = %id, "Stage popped");

        self.node_mut(id)?.stage.post_tick();

        if let Some(callback) = self.ctx.take_step_over(id) {
            callback();
            debug!(stage = %id, "Step over");
            self.wait_while_frozen("step-over");
        }
        Ok(id)
    }

    /// Pop the top stage and check that it has the expected kind.
    ///
    /// The stage is popped either way; a kind mismatch means the caller and
    /// the tree disagree about what is on the stack.
    pub fn pop_expecting(&mut self, expected: &StageKind) -> Result<StageId, TreeError> {
        let id = self.pop()?;
        let node = self.node(id)?;
        if node.kind != *expected {
            let violation = StackViolation::UnexpectedKind {
                popped: node.summary(id),
                expected: expected.clone(),
            };
            error!(%violation, "Popped an unexpected stage");
            return Err(TreeError::StackDisciplineViolation(Box::new(violation)));
        }
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Resume until `target` is popped, then pause. Replaces any pending step.
    pub fn step_over(&self, target: StageId, callback: StepCallback) -> bool {
        self.ctx.step_over(target, callback)
    }

    /// Resume until the next non-provider stage is pushed, then pause.
    /// Replaces any pending step.
    pub fn step_into(&self, callback: StepCallback) {
        self.ctx.step_into(callback);
    }

    /// Hard-reset the tree.
    ///
    /// Empties the active stack and the history, invalidates every issued
    /// [`StageId`], and drops any pending step. If a step was pending the
    /// context is unfrozen so an active pump loop exits.
    pub fn clear(&mut self) -> Result<(), TreeError> {
        self.check_on_thread()?;
        debug!(active = self.active.len(), history = self.history.len(), "Stage tree cleared");
        self.active.clear();
        self.history.clear();
        self.arena.reset();
        if self.ctx.clear_pending() {
            self.ctx.resume();
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Freeze
    // -----------------------------------------------------------------------

    /// Freeze the context and pump until released or the host stops.
    ///
    /// This is the freeze path breakpoints use when they fire.
    pub fn freeze_and_wait(&mut self, reason: &str) -> Result<(), TreeError> {
        self.check_on_thread()?;
        self.wait_while_frozen(reason);
        Ok(())
    }

    fn wait_while_frozen(&mut self, reason: &str) {
        self.ctx.set_paused_stack(self.stack_snapshot());
        self.ctx.freeze(reason);

        let mut pumps: u64 = 0;
        while self.ctx.is_frozen() && self.ctx.is_running() {
            self.pump.pump(&self.ctx);
            pumps = pumps.saturating_add(1);
        }

        self.ctx.set_paused_stack(Vec::new());
        info!(reason, pumps, running = self.ctx.is_running(), "Simulation resumed");
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// The most recently pushed stage that has not been popped.
    pub fn active_stage(&self) -> Option<StageId> {
        self.active.last().copied()
    }

    /// The active stack, root first.
    pub fn active_stages(&self) -> &[StageId] {
        &self.active
    }

    /// Popped stages in pop order.
    pub fn history(&self) -> &[StageId] {
        &self.history
    }

    /// Number of active stages.
    pub fn depth(&self) -> usize {
        self.active.len()
    }

    /// Whether `id` is currently on the active stack.
    pub fn is_active(&self, id: StageId) -> bool {
        self.active.contains(&id)
    }

    /// Parent recorded for `id`.
    pub fn parent_of(&self, id: StageId) -> Result<Option<StageId>, TreeError> {
        Ok(self.node(id)?.parent)
    }

    /// Children pushed under `id`, in push order.
    pub fn children_of(&self, id: StageId) -> Result<&[StageId], TreeError> {
        Ok(&self.node(id)?.children)
    }

    /// Kind of `id`.
    pub fn kind_of(&self, id: StageId) -> Result<&StageKind, TreeError> {
        Ok(&self.node(id)?.kind)
    }

    /// Detached summary of `id`, if it exists in the current epoch.
    pub fn summary(&self, id: StageId) -> Option<StageSummary> {
        self.arena.get(id).map(|node| node.summary(id))
    }

    /// Summaries of the active stack, root first.
    pub fn stack_snapshot(&self) -> Vec<StageSummary> {
        self.active.iter().filter_map(|id| self.summary(*id)).collect()
    }

    /// Number of tick boundaries crossed.
    pub const fn real_ticks(&self) -> u64 {
        self.real_ticks
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    pub(crate) fn check_on_thread(&self) -> Result<(), TreeError> {
        let caller = std::thread::current().id();
        if caller == self.owner {
            return Ok(());
        }
        error!(owner = ?self.owner, caller = ?caller, "Calling stage tree off thread");
        Err(TreeError::ThreadAffinityViolation {
            owner: self.owner,
            caller,
        })
    }

    fn node(&self, id: StageId) -> Result<&StageNode, TreeError> {
        self.arena.get(id).ok_or(TreeError::UnknownStage(id))
    }

    fn node_mut(&mut self, id: StageId) -> Result<&mut StageNode, TreeError> {
        self.arena.get_mut(id).ok_or(TreeError::UnknownStage(id))
    }
}
