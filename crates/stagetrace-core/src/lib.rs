//! Stage tree, stepping state machine and freeze loop for the stagetrace
//! debugger.
//!
//! The host brackets every unit of simulated work with a tick stage. This
//! crate tracks those stages as a call stack, pauses the simulation thread at
//! stage boundaries when a controller asks it to step, and keeps the thread
//! pumping external input while paused.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `stagetrace-config.yaml` into
//!   strongly-typed structs.
//! - [`context`] -- [`DebugContext`] shared freeze/step state and the
//!   [`Pump`] trait.
//! - [`error`] -- [`TreeError`] and the suppressed work failure record.
//! - [`stage`] -- The [`TickStage`] contract and the stage arena.
//! - [`tree`] -- [`StageTree`] push/pop, stepping and freezing.
//! - [`scope`] -- Scoped execution that always pops its stage.
//! - [`tick`] -- Tick boundary helpers.

pub mod config;
pub mod context;
pub mod error;
pub mod scope;
pub mod stage;
pub mod tick;
pub mod tree;

pub use config::{DebuggerConfig, WorkErrorPolicy};
pub use context::{DebugContext, Pump, StepCallback, StepMode, YieldPump};
pub use error::{StackViolation, SuppressedWorkError, TreeError};
pub use scope::StageOutcome;
pub use stage::{MarkerStage, TickStage};
pub use tree::StageTree;
