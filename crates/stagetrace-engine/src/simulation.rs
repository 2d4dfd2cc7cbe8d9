//! Demo simulation run on the dedicated simulation thread.
//!
//! Each tick walks a small world graph the way a block game server does:
//! the server root, a world-provider stage holding one stage per world, a
//! block-update stage per wire block, and nested neighbor updates when a
//! wire's power changes. Every update and state write is offered to the
//! breakpoints, and the tick ends with a packet-provider stage.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stagetrace_breakpoints::BreakpointManager;
use stagetrace_core::config::{DebuggerSettings, SimulationConfig};
use stagetrace_core::{DebugContext, MarkerStage, Pump, StageTree};
use stagetrace_types::{
    BlockChangedEvent, BlockPos, BlockUpdateEvent, RuntimeEvent, StageKind, UpdateCause,
};
use tracing::{debug, info};

use crate::commands::Command;
use crate::controller::lock_manager;
use crate::error::EngineError;
use crate::status::Status;

/// Ticks between power toggles of the demo wire.
const TOGGLE_PERIOD: u32 = 4;

/// How long the pump waits for a command before re-checking the freeze.
const PUMP_WAIT: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// Pump
// ---------------------------------------------------------------------------

/// Pump applying forwarded step commands while the simulation is frozen.
///
/// Reports each new freeze once, with the paused stack.
#[derive(Debug)]
pub struct CommandPump {
    commands: Receiver<Command>,
    reported: u64,
}

impl CommandPump {
    /// Create a pump reading from `commands`.
    pub const fn new(commands: Receiver<Command>) -> Self {
        Self {
            commands,
            reported: 0,
        }
    }
}

impl Pump for CommandPump {
    fn pump(&mut self, ctx: &DebugContext) {
        let count = ctx.freeze_count();
        if count > self.reported {
            self.reported = count;
            Status::Paused {
                reason: ctx.freeze_reason(),
                stack: ctx.paused_stack(),
            }
            .emit();
        }

        match self.commands.recv_timeout(PUMP_WAIT) {
            Ok(command) => apply_step(ctx, &command),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => ctx.shutdown(),
        }
    }
}

fn apply_step(ctx: &DebugContext, command: &Command) {
    let name = match command {
        Command::Into => {
            ctx.step_into(Box::new(|| debug!("Step into landed")));
            "into"
        }
        Command::Over => {
            if let Some(at) = ctx.paused_at() {
                ctx.step_over(at.id, Box::new(|| debug!("Step over landed")));
            } else {
                ctx.resume();
            }
            "over"
        }
        Command::Continue => {
            ctx.resume();
            "continue"
        }
        _ => return,
    };
    Status::Resumed { command: name }.emit();
}

// ---------------------------------------------------------------------------
// Breakpoint hook
// ---------------------------------------------------------------------------

/// Offers runtime events to the shared breakpoint manager.
#[derive(Debug, Clone)]
pub struct Breakpoints {
    manager: Arc<Mutex<BreakpointManager>>,
    enabled: bool,
}

impl Breakpoints {
    /// Hook into `manager`. A disabled hook never evaluates anything.
    pub const fn new(manager: Arc<Mutex<BreakpointManager>>, enabled: bool) -> Self {
        Self { manager, enabled }
    }

    /// Evaluate `event` and freeze if a breakpoint fires.
    ///
    /// The manager lock is released before freezing so the controller can
    /// edit breakpoints while the simulation is paused.
    pub fn offer(&self, tree: &mut StageTree, event: &RuntimeEvent) -> Result<(), EngineError> {
        if !self.enabled {
            return Ok(());
        }
        let hits = lock_manager(&self.manager).evaluate(event)?;
        BreakpointManager::fire(&hits, event, tree)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Demo world
// ---------------------------------------------------------------------------

/// One world: a straight line of redstone wire powered from one end.
#[derive(Debug, Clone)]
pub struct DemoWorld {
    name: String,
    wire: Vec<BlockPos>,
    powered: bool,
    since_toggle: u32,
}

impl DemoWorld {
    /// A world named `name` with `length` wire blocks running east from
    /// `start`.
    pub fn new(name: impl Into<String>, start: BlockPos, length: i32) -> Self {
        let wire = (0..length)
            .map(|dx| BlockPos::new(start.x.saturating_add(dx), start.y, start.z))
            .collect();
        Self {
            name: name.into(),
            wire,
            powered: false,
            since_toggle: 0,
        }
    }

    /// Run this world's stage for one tick.
    pub fn tick(
        &mut self,
        tree: &mut StageTree,
        breakpoints: &Breakpoints,
    ) -> Result<(), EngineError> {
        self.since_toggle = self.since_toggle.saturating_add(1);
        let changed = self.since_toggle >= TOGGLE_PERIOD;
        if changed {
            self.since_toggle = 0;
            self.powered = !self.powered;
        }
        let (old_state, new_state) = (wire_state(!self.powered), wire_state(self.powered));

        let name = self.name.as_str();
        let wire = self.wire.as_slice();
        tree.run_stage(MarkerStage::new(StageKind::World, name), |tree| {
            let next_blocks = wire.iter().skip(1).map(Some).chain(std::iter::once(None));
            for (pos, next) in wire.iter().zip(next_blocks) {
                let label = format!("wire {pos}");
                tree.run_stage(MarkerStage::new(StageKind::BlockUpdate, label), |tree| {
                    let update = RuntimeEvent::BlockUpdate(BlockUpdateEvent {
                        world: name.to_owned(),
                        target_pos: *pos,
                        source_pos: None,
                        cause: UpdateCause::StateUpdate,
                    });
                    breakpoints.offer(tree, &update)?;
                    if !changed {
                        return Ok(());
                    }

                    let write = RuntimeEvent::BlockChanged(BlockChangedEvent {
                        world: name.to_owned(),
                        pos: *pos,
                        old_state: old_state.to_owned(),
                        new_state: new_state.to_owned(),
                    });
                    breakpoints.offer(tree, &write)?;

                    if let Some(next) = next {
                        let label = format!("neighbor {next}");
                        tree.run_stage(MarkerStage::new(StageKind::NeighborUpdate, label), |tree| {
                            let neighbor = RuntimeEvent::BlockUpdate(BlockUpdateEvent {
                                world: name.to_owned(),
                                target_pos: *next,
                                source_pos: Some(*pos),
                                cause: UpdateCause::Neighbor,
                            });
                            breakpoints.offer(tree, &neighbor)
                        })?;
                    }
                    Ok::<(), EngineError>(())
                })?;
            }
            Ok::<(), EngineError>(())
        })?;
        Ok(())
    }
}

const fn wire_state(powered: bool) -> &'static str {
    if powered {
        "redstone_wire[power=15]"
    } else {
        "redstone_wire[power=0]"
    }
}

/// The worlds the demo host runs.
pub fn demo_worlds() -> Vec<DemoWorld> {
    vec![
        DemoWorld::new("overworld", BlockPos::new(0, 64, 0), 4),
        DemoWorld::new("nether", BlockPos::new(0, 32, 0), 2),
    ]
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Run one server tick over `worlds`.
pub fn run_server_tick(
    tree: &mut StageTree,
    worlds: &mut [DemoWorld],
    breakpoints: &Breakpoints,
) -> Result<(), EngineError> {
    let outcome = tree.run_tick(MarkerStage::server_root(), |tree| {
        tree.run_stage(MarkerStage::new(StageKind::WorldProvider, "worlds"), |tree| {
            for world in worlds.iter_mut() {
                world.tick(tree, breakpoints)?;
            }
            Ok::<(), EngineError>(())
        })?;
        tree.run_stage(
            MarkerStage::new(StageKind::NetworkPacket, "controller packets"),
            |_| Ok::<(), EngineError>(()),
        )?;
        Ok::<(), EngineError>(())
    })?;
    if outcome.is_suppressed() {
        debug!(failures = tree.work_failure_count(), "Tick finished with a suppressed failure");
    }
    Ok(())
}

/// Run the simulation loop on the calling thread until the host stops or
/// `max_ticks` is reached. Returns the number of ticks run.
///
/// The stage tree is created here, so the calling thread becomes the
/// simulation thread.
pub fn run(
    ctx: &Arc<DebugContext>,
    breakpoints: &Breakpoints,
    settings: &DebuggerSettings,
    simulation: &SimulationConfig,
    commands: Receiver<Command>,
) -> Result<u64, EngineError> {
    let mut tree = StageTree::new(Arc::clone(ctx), CommandPump::new(commands))
        .with_work_error_policy(settings.work_errors);
    let mut worlds = demo_worlds();
    let interval = Duration::from_millis(simulation.tick_interval_ms);

    if settings.enabled && simulation.pause_on_start {
        ctx.step_into(Box::new(|| debug!("Paused on start")));
    }
    info!(
        worlds = worlds.len(),
        max_ticks = simulation.max_ticks,
        tick_interval_ms = simulation.tick_interval_ms,
        "Simulation thread started"
    );

    while ctx.is_running()
        && (simulation.max_ticks == 0 || tree.real_ticks() < simulation.max_ticks)
    {
        run_server_tick(&mut tree, &mut worlds, breakpoints)?;
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    info!(ticks = tree.real_ticks(), "Simulation thread stopped");
    Ok(tree.real_ticks())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::mpsc;
    use std::time::Instant;

    use stagetrace_breakpoints::BreakpointRegistry;

    use super::*;

    fn breakpoints(enabled: bool) -> (Breakpoints, Arc<Mutex<BreakpointManager>>) {
        let manager = Arc::new(Mutex::new(BreakpointManager::new(
            BreakpointRegistry::with_builtin_kinds(),
        )));
        (Breakpoints::new(Arc::clone(&manager), enabled), manager)
    }

    fn settings() -> DebuggerSettings {
        DebuggerSettings::default()
    }

    fn limited(max_ticks: u64) -> SimulationConfig {
        SimulationConfig {
            max_ticks,
            tick_interval_ms: 0,
            pause_on_start: false,
        }
    }

    #[test]
    fn runs_until_max_ticks() {
        let ctx = Arc::new(DebugContext::new());
        let (breakpoints, _) = breakpoints(true);
        let (_tx, rx) = mpsc::channel();
        let ticks = run(&ctx, &breakpoints, &settings(), &limited(9), rx);
        assert_eq!(ticks.ok(), Some(9));
        assert_eq!(ctx.freeze_count(), 0);
    }

    #[test]
    fn wire_stages_nest_under_the_world() {
        let ctx = Arc::new(DebugContext::new());
        let (_tx, rx) = mpsc::channel();
        let mut tree = StageTree::new(Arc::clone(&ctx), CommandPump::new(rx));
        let (breakpoints, _) = breakpoints(true);
        let mut worlds = vec![DemoWorld::new("overworld", BlockPos::new(0, 64, 0), 2)];

        // Three quiet ticks, then the toggle tick adds a neighbor update.
        for _ in 0..3 {
            assert!(run_server_tick(&mut tree, &mut worlds, &breakpoints).is_ok());
            // root, provider, world, two wires, packets
            assert_eq!(tree.history().len(), 6);
        }
        assert!(run_server_tick(&mut tree, &mut worlds, &breakpoints).is_ok());
        assert_eq!(tree.history().len(), 7);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn breakpoint_pauses_until_continue() {
        let ctx = Arc::new(DebugContext::new());
        let (breakpoints, manager) = breakpoints(true);
        {
            let mut manager = lock_manager(&manager);
            let id = manager.add("block_changed").unwrap();
            if let Some(bp) = manager.get_mut(id) {
                bp.fields.pos = Some(BlockPos::new(1, 64, 0));
            }
        }

        let (tx, rx) = mpsc::channel();
        let sim_ctx = Arc::clone(&ctx);
        let sim = std::thread::spawn(move || {
            run(&sim_ctx, &breakpoints, &settings(), &limited(TOGGLE_PERIOD.into()), rx)
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        while !ctx.is_frozen() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(ctx.is_frozen());
        let at = ctx.paused_at();
        assert_eq!(at.map(|s| s.label), Some(String::from("wire (1, 64, 0)")));
        assert!(tx.send(Command::Continue).is_ok());

        let ticks = sim.join().ok().and_then(Result::ok);
        assert_eq!(ticks, Some(u64::from(TOGGLE_PERIOD)));
        assert_eq!(ctx.freeze_count(), 1);
    }

    #[test]
    fn disabled_hook_never_freezes() {
        let ctx = Arc::new(DebugContext::new());
        let (breakpoints, manager) = breakpoints(false);
        let _ = lock_manager(&manager).add("block_update");
        let (_tx, rx) = mpsc::channel();
        let ticks = run(&ctx, &breakpoints, &settings(), &limited(5), rx);
        assert_eq!(ticks.ok(), Some(5));
        assert_eq!(ctx.freeze_count(), 0);
    }
}
