//! Breakpoints firing inside a running tick.
//!
//! Breakpoints are loaded from serialized specs, the simulation offers block
//! events from inside nested stages, and a controller thread resumes every
//! freeze.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use stagetrace_breakpoints::{BreakpointManager, BreakpointRegistry};
use stagetrace_core::{DebugContext, MarkerStage, StageTree, TreeError};
use stagetrace_types::{
    BlockChangedEvent, BlockPos, BlockUpdateEvent, BreakpointId, BreakpointSpec, RuntimeEvent,
    StageKind, UpdateCause,
};

const SPECS: &str = r#"[
    {"id": 1, "kind": "block_updated", "pos": {"x": 0, "y": 64, "z": 1}},
    {"id": 2, "kind": "block_changed", "pos": {"x": 0, "y": 64, "z": 1}, "enabled": false},
    {"id": 5, "kind": "block_update", "world": "nether"}
]"#;

fn load() -> BreakpointManager {
    let specs: Vec<BreakpointSpec> = serde_json::from_str(SPECS).expect("breakpoint specs parse");
    let mut manager = BreakpointManager::new(BreakpointRegistry::with_builtin_kinds());
    assert_eq!(manager.load_specs(&specs), 3);
    manager
}

fn neighbor_update(world: &str, target: BlockPos) -> RuntimeEvent {
    RuntimeEvent::BlockUpdate(BlockUpdateEvent {
        world: world.to_owned(),
        target_pos: target,
        source_pos: Some(BlockPos::new(0, 64, 0)),
        cause: UpdateCause::Neighbor,
    })
}

#[test]
fn loaded_specs_keep_their_configuration() {
    let manager = load();
    let disabled = manager.get(BreakpointId(2));
    assert_eq!(disabled.map(|bp| bp.enabled), Some(false));
    let nether = manager.get(BreakpointId(5));
    assert_eq!(
        nether.and_then(|bp| bp.fields.world.as_deref()),
        Some("nether")
    );
    assert_eq!(manager.to_specs().len(), 3);
}

#[test]
fn breakpoints_freeze_inside_nested_stages() {
    let manager = load();
    let ctx = Arc::new(DebugContext::new());

    let controller_ctx = Arc::clone(&ctx);
    let controller = std::thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut reasons = Vec::new();
        let mut seen = 0;
        while reasons.len() < 2 && Instant::now() < deadline {
            let count = controller_ctx.freeze_count();
            if count > seen && controller_ctx.is_frozen() {
                seen = count;
                let at = controller_ctx.paused_at().map(|s| s.kind);
                reasons.push((controller_ctx.freeze_reason(), at));
                controller_ctx.resume();
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        reasons
    });

    let mut tree = StageTree::new(Arc::clone(&ctx), |_: &DebugContext| {
        std::thread::sleep(Duration::from_millis(1));
    });
    let mut hits = Vec::new();
    let outcome = tree.run_tick(MarkerStage::server_root(), |tree| {
        for world in ["overworld", "nether"] {
            tree.run_stage(MarkerStage::new(StageKind::World, world), |tree| {
                tree.run_stage(MarkerStage::new(StageKind::NeighborUpdate, "wire"), |tree| {
                    let event = neighbor_update(world, BlockPos::new(0, 64, 1));
                    let fired = manager.dispatch(&event, tree).map_err(|e| e.to_string())?;
                    hits.push(fired);

                    let change = RuntimeEvent::BlockChanged(BlockChangedEvent {
                        world: world.to_owned(),
                        pos: BlockPos::new(0, 64, 1),
                        old_state: String::from("redstone_wire[power=0]"),
                        new_state: String::from("redstone_wire[power=1]"),
                    });
                    let fired = manager.dispatch(&change, tree).map_err(|e| e.to_string())?;
                    hits.push(fired);
                    Ok::<(), String>(())
                })?;
                Ok::<(), TreeError>(())
            })?;
        }
        Ok::<(), TreeError>(())
    });
    assert!(outcome.is_ok_and(|o| !o.is_suppressed()));

    assert_eq!(
        hits,
        vec![
            vec![BreakpointId(1)],
            vec![],
            vec![BreakpointId(1), BreakpointId(5)],
            vec![],
        ]
    );

    let reasons = controller.join().unwrap();
    assert_eq!(
        reasons,
        vec![
            (
                Some(String::from("breakpoint #1")),
                Some(StageKind::NeighborUpdate)
            ),
            (
                Some(String::from("breakpoint #1")),
                Some(StageKind::NeighborUpdate)
            ),
        ]
    );
    assert_eq!(ctx.freeze_count(), 2);
    assert_eq!(tree.depth(), 0);
}
