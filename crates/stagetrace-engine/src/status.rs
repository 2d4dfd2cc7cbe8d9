//! JSON status lines printed to stdout for the controller.
//!
//! Logs go to stderr, so stdout carries nothing but one [`Status`] object per
//! line.

use std::sync::Arc;

use serde::Serialize;
use stagetrace_breakpoints::{BreakpointKind, BreakpointRegistry, FieldDescriptor};
use stagetrace_types::{BreakpointId, BreakpointSpec, StageSummary};
use tracing::warn;

/// One status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Status {
    /// The simulation thread froze.
    Paused {
        /// Reason given to the freeze.
        reason: Option<String>,
        /// Active stack, root first.
        stack: Vec<StageSummary>,
    },
    /// A step or continue released the freeze.
    Resumed {
        /// The command that released it.
        command: &'static str,
    },
    /// The simulation will pause at the next stage.
    Pausing,
    /// The simulation is not paused.
    Running,
    /// Paused stack, root first.
    Stack {
        /// Active stack.
        stages: Vec<StageSummary>,
    },
    /// Every breakpoint.
    Breakpoints {
        /// Breakpoint records.
        breakpoints: Vec<BreakpointSpec>,
    },
    /// Every breakpoint kind.
    Kinds {
        /// Kind descriptions.
        kinds: Vec<KindInfo>,
    },
    /// A breakpoint was added.
    BreakpointAdded {
        /// Its identifier.
        id: BreakpointId,
    },
    /// A breakpoint was removed.
    BreakpointRemoved {
        /// Its identifier.
        id: BreakpointId,
    },
    /// A breakpoint was enabled or disabled.
    BreakpointToggled {
        /// Its identifier.
        id: BreakpointId,
        /// New state.
        enabled: bool,
    },
    /// The simulation thread stopped.
    Stopped {
        /// Ticks run.
        ticks: u64,
    },
    /// A command failed.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl Status {
    /// Error status from anything displayable.
    pub fn error(message: impl core::fmt::Display) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }

    /// Print as one JSON line on stdout.
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "Failed to serialize status"),
        }
    }
}

/// Description of a breakpoint kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindInfo {
    /// Stable identifier.
    pub id: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Keys of the configurable fields.
    pub fields: Vec<&'static str>,
}

impl KindInfo {
    /// Describe every kind in `registry`.
    pub fn list(registry: &BreakpointRegistry) -> Vec<Self> {
        registry.kinds().map(Self::describe).collect()
    }

    fn describe(kind: &Arc<dyn BreakpointKind>) -> Self {
        let sample = Arc::clone(kind).create(BreakpointId(0));
        let mut fields: Vec<FieldDescriptor> = Vec::new();
        kind.append_fields(&mut fields, &sample);
        Self {
            id: kind.id(),
            description: kind.description(),
            fields: fields.into_iter().map(|field| field.key).collect(),
        }
    }
}
