//! Controller side of the engine: applies parsed commands.
//!
//! Breakpoint bookkeeping happens here directly under the manager lock.
//! Step commands are forwarded over a channel to the simulation thread's
//! pump, which is the only place they take effect.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use stagetrace_breakpoints::BreakpointManager;
use stagetrace_core::DebugContext;
use tracing::{debug, info};

use crate::commands::Command;
use crate::status::{KindInfo, Status};

/// Lock the shared breakpoint manager, recovering it if a holder panicked.
pub fn lock_manager(manager: &Mutex<BreakpointManager>) -> MutexGuard<'_, BreakpointManager> {
    manager.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Applies controller commands on the input task.
#[derive(Debug)]
pub struct Controller {
    ctx: Arc<DebugContext>,
    manager: Arc<Mutex<BreakpointManager>>,
    steps: Sender<Command>,
    stepping_enabled: bool,
}

impl Controller {
    /// Create a controller forwarding step commands to `steps`.
    pub const fn new(
        ctx: Arc<DebugContext>,
        manager: Arc<Mutex<BreakpointManager>>,
        steps: Sender<Command>,
        stepping_enabled: bool,
    ) -> Self {
        Self {
            ctx,
            manager,
            steps,
            stepping_enabled,
        }
    }

    /// Apply one command and return the status to report.
    ///
    /// Step commands return `None`: the simulation thread reports them once
    /// its pump has applied them.
    pub fn handle(&self, command: Command) -> Option<Status> {
        debug!(?command, "Controller command");
        if command.needs_pause() {
            return self.forward_step(command);
        }

        let status = match command {
            Command::Pause => self.pause(),
            Command::Stack => {
                if self.ctx.is_frozen() {
                    Status::Stack {
                        stages: self.ctx.paused_stack(),
                    }
                } else {
                    Status::Running
                }
            }
            Command::AddBreakpoint { kind, pos } => {
                let mut manager = lock_manager(&self.manager);
                match manager.add(&kind) {
                    Ok(id) => {
                        if let Some(breakpoint) = manager.get_mut(id) {
                            breakpoint.fields.pos = pos;
                        }
                        Status::BreakpointAdded { id }
                    }
                    Err(e) => Status::error(e),
                }
            }
            Command::RemoveBreakpoint(id) => match lock_manager(&self.manager).remove(id) {
                Some(_) => Status::BreakpointRemoved { id },
                None => Status::error(format!("unknown breakpoint {id}")),
            },
            Command::ToggleBreakpoint(id, enabled) => {
                match lock_manager(&self.manager).set_enabled(id, enabled) {
                    Ok(()) => Status::BreakpointToggled { id, enabled },
                    Err(e) => Status::error(e),
                }
            }
            Command::ListBreakpoints => Status::Breakpoints {
                breakpoints: lock_manager(&self.manager).to_specs(),
            },
            Command::Kinds => Status::Kinds {
                kinds: KindInfo::list(lock_manager(&self.manager).registry()),
            },
            Command::Into | Command::Over | Command::Continue | Command::Quit => return None,
        };
        Some(status)
    }

    fn forward_step(&self, command: Command) -> Option<Status> {
        if !self.stepping_enabled {
            return Some(Status::error("stepping is disabled"));
        }
        if !self.ctx.is_frozen() {
            return Some(Status::error("not paused"));
        }
        if self.steps.send(command).is_err() {
            return Some(Status::error("simulation stopped"));
        }
        None
    }

    fn pause(&self) -> Status {
        if !self.stepping_enabled {
            return Status::error("stepping is disabled");
        }
        if self.ctx.is_frozen() {
            return Status::error("already paused");
        }
        self.ctx
            .step_into(Box::new(|| debug!("Pause request reached a stage")));
        info!("Pause requested");
        Status::Pausing
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use stagetrace_breakpoints::BreakpointRegistry;
    use stagetrace_core::StepMode;
    use stagetrace_types::{BlockPos, BreakpointId};

    use super::*;

    fn controller(enabled: bool) -> (Controller, mpsc::Receiver<Command>) {
        let (tx, rx) = mpsc::channel();
        let manager = BreakpointManager::new(BreakpointRegistry::with_builtin_kinds());
        let controller = Controller::new(
            Arc::new(DebugContext::new()),
            Arc::new(Mutex::new(manager)),
            tx,
            enabled,
        );
        (controller, rx)
    }

    #[test]
    fn step_commands_need_a_pause() {
        let (controller, rx) = controller(true);
        assert_eq!(
            controller.handle(Command::Into),
            Some(Status::error("not paused"))
        );
        assert!(rx.try_recv().is_err());

        controller.ctx.freeze("test");
        assert_eq!(controller.handle(Command::Over), None);
        assert_eq!(rx.try_recv().ok(), Some(Command::Over));
    }

    #[test]
    fn pause_requests_a_step_into() {
        let (controller, _rx) = controller(true);
        assert_eq!(controller.handle(Command::Pause), Some(Status::Pausing));
        assert_eq!(controller.ctx.pending_step(), StepMode::Into);
        assert_eq!(controller.handle(Command::Stack), Some(Status::Running));
    }

    #[test]
    fn disabled_stepping_rejects_pause() {
        let (controller, _rx) = controller(false);
        assert_eq!(
            controller.handle(Command::Pause),
            Some(Status::error("stepping is disabled"))
        );
        assert_eq!(controller.ctx.pending_step(), StepMode::None);
    }

    #[test]
    fn breakpoint_bookkeeping() {
        let (controller, _rx) = controller(true);
        let added = controller.handle(Command::AddBreakpoint {
            kind: String::from("block_updated"),
            pos: Some(BlockPos::new(2, 64, 2)),
        });
        assert_eq!(added, Some(Status::BreakpointAdded { id: BreakpointId(1) }));

        let breakpoints = match controller.handle(Command::ListBreakpoints) {
            Some(Status::Breakpoints { breakpoints }) => breakpoints,
            _ => Vec::new(),
        };
        assert_eq!(
            breakpoints.first().and_then(|spec| spec.pos),
            Some(BlockPos::new(2, 64, 2))
        );

        assert_eq!(
            controller.handle(Command::ToggleBreakpoint(BreakpointId(1), false)),
            Some(Status::BreakpointToggled {
                id: BreakpointId(1),
                enabled: false
            })
        );
        assert_eq!(
            controller.handle(Command::RemoveBreakpoint(BreakpointId(1))),
            Some(Status::BreakpointRemoved { id: BreakpointId(1) })
        );
        assert!(matches!(
            controller.handle(Command::RemoveBreakpoint(BreakpointId(1))),
            Some(Status::Error { .. })
        ));
        assert!(matches!(
            controller.handle(Command::AddBreakpoint {
                kind: String::from("entity_spawn"),
                pos: None
            }),
            Some(Status::Error { .. })
        ));
    }
}
