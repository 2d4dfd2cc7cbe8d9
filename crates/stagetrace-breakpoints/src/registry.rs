//! Registry of breakpoint kinds, keyed by identifier.

use std::collections::BTreeMap;
use std::sync::Arc;

use stagetrace_types::BreakpointId;
use tracing::{debug, warn};

use crate::breakpoint::Breakpoint;
use crate::error::RegistryError;
use crate::kind::BreakpointKind;
use crate::kinds::{BlockChangedKind, BlockUpdateKind, BlockUpdatedKind};

/// Every breakpoint kind a controller can instantiate.
#[derive(Clone, Default)]
pub struct BreakpointRegistry {
    kinds: BTreeMap<&'static str, Arc<dyn BreakpointKind>>,
}

impl BreakpointRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in kinds.
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        let builtin: [Arc<dyn BreakpointKind>; 3] = [
            Arc::new(BlockUpdateKind::new()),
            Arc::new(BlockUpdatedKind::default()),
            Arc::new(BlockChangedKind::new()),
        ];
        for kind in builtin {
            if let Err(e) = registry.register(kind) {
                warn!(error = %e, "Skipping built-in breakpoint kind");
            }
        }
        registry
    }

    /// Register a kind under its identifier.
    pub fn register(&mut self, kind: Arc<dyn BreakpointKind>) -> Result<(), RegistryError> {
        let id = kind.id();
        if self.kinds.contains_key(id) {
            return Err(RegistryError::DuplicateKind(id));
        }
        debug!(kind = id, "Registered breakpoint kind");
        self.kinds.insert(id, kind);
        Ok(())
    }

    /// Look up a kind.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn BreakpointKind>> {
        self.kinds.get(id)
    }

    /// All kinds, in identifier order.
    pub fn kinds(&self) -> impl Iterator<Item = &Arc<dyn BreakpointKind>> {
        self.kinds.values()
    }

    /// Instantiate a breakpoint of kind `kind_id`.
    pub fn create(&self, kind_id: &str, id: BreakpointId) -> Result<Breakpoint, RegistryError> {
        self.get(kind_id)
            .map(|kind| Arc::clone(kind).create(id))
            .ok_or_else(|| RegistryError::UnknownKind(kind_id.to_owned()))
    }
}

impl core::fmt::Debug for BreakpointRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.kinds.keys()).finish()
    }
}
