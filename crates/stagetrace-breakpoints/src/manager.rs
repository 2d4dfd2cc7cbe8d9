//! Breakpoint bookkeeping and event dispatch.
//!
//! [`BreakpointManager`] owns the live breakpoints. The host offers each
//! runtime event through [`BreakpointManager::dispatch`], which freezes the
//! simulation thread through the stage tree when any enabled breakpoint
//! fires. Hosts that share the manager behind a lock should call
//! [`BreakpointManager::evaluate`] under the lock and
//! [`BreakpointManager::fire`] after releasing it.

use std::collections::BTreeMap;

use stagetrace_core::{StageTree, TreeError};
use stagetrace_types::{BreakpointId, BreakpointSpec, RuntimeEvent};
use tracing::{debug, info, warn};

use crate::breakpoint::Breakpoint;
use crate::error::{BreakpointMatchError, DispatchError, RegistryError};
use crate::registry::BreakpointRegistry;

/// Live breakpoints and the kinds they are created from.
#[derive(Debug)]
pub struct BreakpointManager {
    registry: BreakpointRegistry,
    breakpoints: BTreeMap<BreakpointId, Breakpoint>,
    next_id: u32,
}

impl BreakpointManager {
    /// A manager with no breakpoints.
    pub const fn new(registry: BreakpointRegistry) -> Self {
        Self {
            registry,
            breakpoints: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// The kind registry.
    pub const fn registry(&self) -> &BreakpointRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Bookkeeping
    // -----------------------------------------------------------------------

    /// Create an enabled breakpoint of kind `kind_id` with a fresh identifier.
    pub fn add(&mut self, kind_id: &str) -> Result<BreakpointId, RegistryError> {
        let id = BreakpointId(self.next_id);
        let breakpoint = self.registry.create(kind_id, id)?;
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(RegistryError::IdsExhausted)?;
        self.breakpoints.insert(id, breakpoint);
        info!(breakpoint = %id, kind = kind_id, "Breakpoint added");
        Ok(id)
    }

    /// Insert or replace a breakpoint under its own identifier.
    pub fn insert(&mut self, breakpoint: Breakpoint) -> Option<Breakpoint> {
        let id = breakpoint.id();
        if id.0 >= self.next_id {
            self.next_id = id.0.saturating_add(1);
        }
        self.breakpoints.insert(id, breakpoint)
    }

    /// Remove a breakpoint.
    pub fn remove(&mut self, id: BreakpointId) -> Option<Breakpoint> {
        let removed = self.breakpoints.remove(&id);
        if removed.is_some() {
            info!(breakpoint = %id, "Breakpoint removed");
        }
        removed
    }

    /// Look up a breakpoint.
    pub fn get(&self, id: BreakpointId) -> Option<&Breakpoint> {
        self.breakpoints.get(&id)
    }

    /// Look up a breakpoint for editing its fields.
    pub fn get_mut(&mut self, id: BreakpointId) -> Option<&mut Breakpoint> {
        self.breakpoints.get_mut(&id)
    }

    /// Enable or disable a breakpoint.
    pub fn set_enabled(&mut self, id: BreakpointId, enabled: bool) -> Result<(), RegistryError> {
        let breakpoint = self
            .breakpoints
            .get_mut(&id)
            .ok_or(RegistryError::UnknownBreakpoint(id))?;
        breakpoint.enabled = enabled;
        debug!(breakpoint = %id, enabled, "Breakpoint toggled");
        Ok(())
    }

    /// All breakpoints, in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }

    /// Number of breakpoints.
    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    /// Whether there are no breakpoints.
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    // -----------------------------------------------------------------------
    // Matching
    // -----------------------------------------------------------------------

    /// Identifiers of the enabled breakpoints `event` fires.
    ///
    /// Breakpoints whose kind cannot interpret the event's shape are not
    /// offered it. An unsupported-event error from a kind that claimed to
    /// accept the event is returned as is.
    pub fn evaluate(&self, event: &RuntimeEvent) -> Result<Vec<BreakpointId>, BreakpointMatchError> {
        let tag = event.tag();
        let mut hits = Vec::new();
        for breakpoint in self.breakpoints.values() {
            if !breakpoint.enabled || !breakpoint.kind().accepts(tag) {
                continue;
            }
            if breakpoint.call(event)? {
                hits.push(breakpoint.id());
            }
        }
        Ok(hits)
    }

    /// Evaluate `event` and, if anything fires, freeze the simulation thread
    /// until a controller resumes it.
    pub fn dispatch(
        &self,
        event: &RuntimeEvent,
        tree: &mut StageTree,
    ) -> Result<Vec<BreakpointId>, DispatchError> {
        let hits = self.evaluate(event)?;
        Self::fire(&hits, event, tree)?;
        Ok(hits)
    }

    /// Freeze the simulation thread for breakpoints `event` fired.
    ///
    /// Does nothing if `hits` is empty. The freeze reason names the first
    /// hit. Hosts holding the manager behind a lock call this after
    /// releasing it, with the result of [`evaluate`](Self::evaluate).
    pub fn fire(
        hits: &[BreakpointId],
        event: &RuntimeEvent,
        tree: &mut StageTree,
    ) -> Result<(), TreeError> {
        let Some(first) = hits.first() else {
            return Ok(());
        };
        info!(
            breakpoint = %first,
            hits = hits.len(),
            pos = %event.target_pos(),
            world = event.world(),
            "Breakpoint hit"
        );
        tree.freeze_and_wait(&format!("breakpoint {first}"))
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Replace every breakpoint with those described by `specs`.
    ///
    /// Specs naming an unknown kind are skipped with a warning; the rest are
    /// loaded. Returns the number loaded.
    pub fn load_specs(&mut self, specs: &[BreakpointSpec]) -> usize {
        self.breakpoints.clear();
        self.next_id = 1;
        for spec in specs {
            match self.registry.create(&spec.kind, spec.id) {
                Ok(mut breakpoint) => {
                    breakpoint.enabled = spec.enabled;
                    breakpoint.fields.pos = spec.pos;
                    breakpoint.fields.world.clone_from(&spec.world);
                    self.insert(breakpoint);
                }
                Err(e) => warn!(breakpoint = %spec.id, error = %e, "Skipping breakpoint"),
            }
        }
        info!(loaded = self.breakpoints.len(), "Breakpoints loaded");
        self.breakpoints.len()
    }

    /// Serializable records of every breakpoint, in identifier order.
    pub fn to_specs(&self) -> Vec<BreakpointSpec> {
        self.breakpoints.values().map(Breakpoint::to_spec).collect()
    }
}
