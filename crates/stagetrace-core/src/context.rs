//! Shared debugger control state.
//!
//! [`DebugContext`] is the one piece of state the simulation thread shares
//! with controllers: the `frozen` flag, the host-running flag, and the
//! pending step request. It is wrapped in [`Arc`] and handed to the stage
//! tree and to whatever thread reacts to user input.
//!
//! # Architecture
//!
//! `frozen` and `running` are atomics so the pump loop can poll them on the
//! hot path without locking. The pending step request carries a one-shot
//! callback, so it sits behind a [`Mutex`]; it is taken atomically together
//! with the check of its trigger condition, which makes every step request
//! fire at most once.
//!
//! [`Arc`]: std::sync::Arc

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use stagetrace_types::{StageId, StageSummary};
use tracing::{debug, info};

/// One-shot callback run when a step request triggers.
pub type StepCallback = Box<dyn FnOnce() + Send>;

/// A step request waiting for its trigger condition.
#[derive(Default)]
enum PendingStep {
    /// Nothing requested.
    #[default]
    None,
    /// Pause once `target` is popped.
    Over {
        target: StageId,
        callback: StepCallback,
    },
    /// Pause once the next non-provider stage is pushed.
    Into { callback: StepCallback },
}

/// Observable view of the pending step request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// No step request is pending.
    None,
    /// A step-over is waiting for the given stage to be popped.
    Over(StageId),
    /// A step-into is waiting for the next qualifying push.
    Into,
}

/// Shared freeze and stepping state.
#[derive(Debug)]
pub struct DebugContext {
    /// Whether the simulation thread should stay parked in its pump loop.
    frozen: AtomicBool,

    /// Whether the host is still running. Pump loops exit once this drops.
    running: AtomicBool,

    /// Number of freezes since creation.
    freeze_count: AtomicU64,

    /// Reason given to the most recent freeze.
    freeze_reason: Mutex<Option<String>>,

    /// Pending step request (last write wins).
    pending: Mutex<PendingStep>,

    /// Active stack while paused, root first. Empty when running.
    paused_stack: Mutex<Vec<StageSummary>>,
}

impl core::fmt::Debug for PendingStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Over { target, .. } => f.debug_struct("Over").field("target", target).finish(),
            Self::Into { .. } => f.write_str("Into"),
        }
    }
}

impl Default for DebugContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugContext {
    /// Create a running, unfrozen context with no pending step.
    pub const fn new() -> Self {
        Self {
            frozen: AtomicBool::new(false),
            running: AtomicBool::new(true),
            freeze_count: AtomicU64::new(0),
            freeze_reason: Mutex::new(None),
            pending: Mutex::new(PendingStep::None),
            paused_stack: Mutex::new(Vec::new()),
        }
    }

    // -----------------------------------------------------------------------
    // Freeze / Resume
    // -----------------------------------------------------------------------

    /// Check whether the simulation is frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Freeze the simulation. The stage tree's pump loop keeps running
    /// until [`resume`](Self::resume) or a step request clears the flag.
    pub fn freeze(&self, reason: &str) {
        *lock(&self.freeze_reason) = Some(reason.to_owned());
        self.freeze_count.fetch_add(1, Ordering::AcqRel);
        self.frozen.store(true, Ordering::Release);
        info!(reason, "Simulation frozen");
    }

    /// Clear the frozen flag without requesting a step.
    pub fn resume(&self) {
        self.frozen.store(false, Ordering::Release);
    }

    /// Reason given to the most recent freeze.
    pub fn freeze_reason(&self) -> Option<String> {
        lock(&self.freeze_reason).clone()
    }

    /// Number of freezes since creation.
    pub fn freeze_count(&self) -> u64 {
        self.freeze_count.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Host lifetime
    // -----------------------------------------------------------------------

    /// Mark the host as stopping. Every pump loop exits on its next check.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Check whether the host is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Request a pause once `target` is popped, replacing any pending step,
    /// and release the current freeze.
    pub fn step_over(&self, target: StageId, callback: StepCallback) -> bool {
        *lock(&self.pending) = PendingStep::Over { target, callback };
        self.resume();
        debug!(%target, "Step over requested");
        true
    }

    /// Request a pause at the next non-provider push, replacing any pending
    /// step, and release the current freeze.
    pub fn step_into(&self, callback: StepCallback) {
        *lock(&self.pending) = PendingStep::Into { callback };
        self.resume();
        debug!("Step into requested");
    }

    /// Observable view of the pending step request.
    pub fn pending_step(&self) -> StepMode {
        match &*lock(&self.pending) {
            PendingStep::None => StepMode::None,
            PendingStep::Over { target, .. } => StepMode::Over(*target),
            PendingStep::Into { .. } => StepMode::Into,
        }
    }

    /// Drop any pending step request. Returns whether one was pending.
    pub fn clear_pending(&self) -> bool {
        let previous = core::mem::take(&mut *lock(&self.pending));
        !matches!(previous, PendingStep::None)
    }

    /// Drop a pending step-over, leaving a pending step-into in place.
    pub(crate) fn cancel_step_over(&self) -> bool {
        let mut pending = lock(&self.pending);
        if matches!(*pending, PendingStep::Over { .. }) {
            *pending = PendingStep::None;
            true
        } else {
            false
        }
    }

    /// Consume a pending step-into.
    pub(crate) fn take_step_into(&self) -> Option<StepCallback> {
        let mut pending = lock(&self.pending);
        if !matches!(*pending, PendingStep::Into { .. }) {
            return None;
        }
        match core::mem::take(&mut *pending) {
            PendingStep::Into { callback } => Some(callback),
            PendingStep::None | PendingStep::Over { .. } => None,
        }
    }

    /// Consume a pending step-over if `popped` is its target.
    pub(crate) fn take_step_over(&self, popped: StageId) -> Option<StepCallback> {
        let mut pending = lock(&self.pending);
        if !matches!(*pending, PendingStep::Over { target, .. } if target == popped) {
            return None;
        }
        match core::mem::take(&mut *pending) {
            PendingStep::Over { callback, .. } => Some(callback),
            PendingStep::None | PendingStep::Into { .. } => None,
        }
    }

    // -----------------------------------------------------------------------
    // Pause location
    // -----------------------------------------------------------------------

    /// Stage the tree is currently paused at, if paused inside a stage.
    pub fn paused_at(&self) -> Option<StageSummary> {
        lock(&self.paused_stack).last().cloned()
    }

    /// Snapshot of the active stack while paused, root first.
    pub fn paused_stack(&self) -> Vec<StageSummary> {
        lock(&self.paused_stack).clone()
    }

    pub(crate) fn set_paused_stack(&self, stack: Vec<StageSummary>) {
        *lock(&self.paused_stack) = stack;
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Every guarded field is a plain value that is only ever replaced whole,
/// so a poisoned lock still holds a consistent value.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Pump
// ---------------------------------------------------------------------------

/// External input pump driven while the simulation is frozen.
///
/// The stage tree calls [`pump`](Pump::pump) in a loop for as long as the
/// context is frozen and the host is running. Each call should drain one
/// batch of pending input (network packets, controller commands) and return;
/// it is the only way the simulation thread observes the commands that end
/// the pause.
pub trait Pump: Send {
    /// Drain one batch of external input.
    fn pump(&mut self, ctx: &DebugContext);
}

impl<F> Pump for F
where
    F: FnMut(&DebugContext) + Send,
{
    fn pump(&mut self, ctx: &DebugContext) {
        self(ctx);
    }
}

/// Pump for hosts whose control input arrives on other threads.
///
/// It only yields the thread; the freeze ends when another thread calls
/// [`DebugContext::resume`], a step request, or [`DebugContext::shutdown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldPump;

impl Pump for YieldPump {
    fn pump(&mut self, _ctx: &DebugContext) {
        std::thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn stage(index: u32) -> StageId {
        StageId::from_parts(index, 0)
    }

    #[test]
    fn initial_state_is_running_and_unfrozen() {
        let ctx = DebugContext::new();
        assert!(!ctx.is_frozen());
        assert!(ctx.is_running());
        assert_eq!(ctx.pending_step(), StepMode::None);
        assert_eq!(ctx.freeze_count(), 0);
    }

    #[test]
    fn freeze_and_resume() {
        let ctx = DebugContext::new();
        ctx.freeze("manual");
        assert!(ctx.is_frozen());
        assert_eq!(ctx.freeze_reason().as_deref(), Some("manual"));
        assert_eq!(ctx.freeze_count(), 1);
        ctx.resume();
        assert!(!ctx.is_frozen());
    }

    #[test]
    fn step_requests_release_the_freeze() {
        let ctx = DebugContext::new();
        ctx.freeze("breakpoint");
        assert!(ctx.step_over(stage(1), Box::new(|| {})));
        assert!(!ctx.is_frozen());

        ctx.freeze("breakpoint");
        ctx.step_into(Box::new(|| {}));
        assert!(!ctx.is_frozen());
    }

    #[test]
    fn last_step_request_wins() {
        let ctx = DebugContext::new();
        ctx.step_into(Box::new(|| {}));
        ctx.step_over(stage(4), Box::new(|| {}));
        assert_eq!(ctx.pending_step(), StepMode::Over(stage(4)));
        assert!(ctx.take_step_into().is_none());

        ctx.step_into(Box::new(|| {}));
        assert_eq!(ctx.pending_step(), StepMode::Into);
        assert!(ctx.take_step_over(stage(4)).is_none());
    }

    #[test]
    fn step_over_only_fires_for_its_target() {
        let ctx = DebugContext::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        ctx.step_over(
            stage(2),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(ctx.take_step_over(stage(3)).is_none());
        let callback = ctx.take_step_over(stage(2));
        assert!(callback.is_some());
        if let Some(callback) = callback {
            callback();
        }
        assert!(ctx.take_step_over(stage(2)).is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.pending_step(), StepMode::None);
    }

    #[test]
    fn cancel_step_over_keeps_step_into() {
        let ctx = DebugContext::new();
        ctx.step_into(Box::new(|| {}));
        assert!(!ctx.cancel_step_over());
        assert_eq!(ctx.pending_step(), StepMode::Into);

        ctx.step_over(stage(0), Box::new(|| {}));
        assert!(ctx.cancel_step_over());
        assert_eq!(ctx.pending_step(), StepMode::None);
    }

    #[test]
    fn clear_pending_reports_whether_anything_was_pending() {
        let ctx = DebugContext::new();
        assert!(!ctx.clear_pending());
        ctx.step_into(Box::new(|| {}));
        assert!(ctx.clear_pending());
        assert_eq!(ctx.pending_step(), StepMode::None);
    }

    #[test]
    fn shutdown_stops_running() {
        let ctx = DebugContext::new();
        ctx.shutdown();
        assert!(!ctx.is_running());
    }

    #[test]
    fn closures_are_pumps() {
        let ctx = DebugContext::new();
        ctx.freeze("test");
        let mut pump = |ctx: &DebugContext| ctx.resume();
        Pump::pump(&mut pump, &ctx);
        assert!(!ctx.is_frozen());
    }
}
