//! Shared type definitions for the stagetrace tick-stage debugger.
//!
//! This crate holds the plain data that flows between the stage tree, the
//! breakpoint matcher and the host harness. Nothing here owns behavior
//! beyond small accessors.
//!
//! # Modules
//!
//! - [`ids`] -- Stage arena handles and numeric breakpoint identifiers
//! - [`enums`] -- Stage kinds and event tags
//! - [`events`] -- Runtime events offered to breakpoints
//! - [`structs`] -- Stage summaries and persisted breakpoint records

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EventTag, StageKind};
pub use events::{BlockChangedEvent, BlockPos, BlockUpdateEvent, RuntimeEvent, UpdateCause};
pub use ids::{BreakpointId, StageId};
pub use structs::{BreakpointSpec, StageSummary};
