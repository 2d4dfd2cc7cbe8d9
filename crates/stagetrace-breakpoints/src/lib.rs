//! Breakpoint kinds, matcher chains and dispatch for the stagetrace debugger.
//!
//! A breakpoint is an instance of a [`BreakpointKind`]. Kinds own a
//! [`MatchChain`] that decides whether a [`RuntimeEvent`] fires an instance,
//! and may build on another kind's chain. The [`BreakpointManager`] holds the
//! live instances and freezes the simulation thread through the stage tree
//! when one fires.
//!
//! # Modules
//!
//! - [`breakpoint`] -- [`Breakpoint`] instances and their configured fields.
//! - [`error`] -- Match, registry and dispatch errors.
//! - [`fields`] -- The field contract a UI layer renders.
//! - [`kind`] -- The [`BreakpointKind`] trait.
//! - [`kinds`] -- Built-in kinds.
//! - [`manager`] -- [`BreakpointManager`] bookkeeping, matching, persistence.
//! - [`matcher`] -- [`Matcher`] links and [`MatchChain`].
//! - [`registry`] -- [`BreakpointRegistry`] of kinds by identifier.
//!
//! [`RuntimeEvent`]: stagetrace_types::RuntimeEvent

pub mod breakpoint;
pub mod error;
pub mod fields;
pub mod kind;
pub mod kinds;
pub mod manager;
pub mod matcher;
pub mod registry;

pub use breakpoint::{Breakpoint, BreakpointFields};
pub use error::{BreakpointMatchError, DispatchError, RegistryError};
pub use fields::{FieldContainer, FieldDescriptor, FieldValue};
pub use kind::BreakpointKind;
pub use kinds::{BlockChangedKind, BlockUpdateKind, BlockUpdatedKind};
pub use manager::BreakpointManager;
pub use matcher::{
    Always, MatchChain, Matcher, PositionFilter, RequireEvent, Verdict, WorldFilter,
};
pub use registry::BreakpointRegistry;
