//! Configuration field contract between breakpoint kinds and a UI layer.
//!
//! Kinds describe their configurable fields by appending
//! [`FieldDescriptor`]s to whatever [`FieldContainer`] the UI hands them.
//! Rendering is entirely the container's business.

use stagetrace_types::BlockPos;

/// Current value of a configurable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A block position, unset if `None`.
    Position(Option<BlockPos>),
    /// Free text, unset if `None`.
    Text(Option<String>),
}

/// One configurable field of a breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Stable key, matching the field name in a [`BreakpointSpec`].
    ///
    /// [`BreakpointSpec`]: stagetrace_types::BreakpointSpec
    pub key: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Current value on the breakpoint being configured.
    pub value: FieldValue,
}

/// Target a breakpoint kind contributes its fields to.
pub trait FieldContainer {
    /// Append one field.
    fn add_field(&mut self, field: FieldDescriptor);
}

impl FieldContainer for Vec<FieldDescriptor> {
    fn add_field(&mut self, field: FieldDescriptor) {
        self.push(field);
    }
}
