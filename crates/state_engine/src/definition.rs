//! Per-state configuration as authored in a catalog.
//!
//! A [`StateDefinition`] references other states by name. Names are resolved
//! into dense [`StateId`]s once, when the catalog is built into a
//! [`StateRegistry`](crate::registry::StateRegistry).

use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

/// Dense index of a state inside its registry, assigned in catalog order.
///
/// Only a registry hands these out; catalogs refer to states by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub(crate) u32);

impl StateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Side-effect configuration
// =============================================================================

/// What a state does to the global time scale when it is enabled or disabled.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TimeScaleDirective {
    /// Leave the time scale alone.
    #[default]
    None,
    /// Remember the current scale, then switch to this one.
    Set(f32),
    /// Swap the current and previous scale.
    Revert,
}

// =============================================================================
// StateDefinition
// =============================================================================

/// Immutable configuration of one state.
///
/// All relation lists hold state *names*; unknown names are rejected when the
/// registry is built.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateDefinition {
    pub name: String,
    /// Every listed state must be active for this one to activate.
    pub substate_of: Vec<String>,
    /// Activation is refused while any listed state is active.
    pub blocked_by: Vec<String>,
    /// Activation leaves every other active state alone.
    pub do_not_override_any: bool,
    /// Survives override unless the activator lists it in `always_override`.
    pub cant_override_by_default: bool,
    /// States left active even though they would otherwise be overridden.
    /// Parents from `substate_of` are added automatically at build time.
    pub do_not_override: Vec<String>,
    /// States deactivated even when they are `cant_override_by_default`.
    pub always_override: Vec<String>,
    /// Re-activating while active deactivates the state instead.
    pub toggle: bool,
    /// On enable: lock and hide the cursor if true, release and show it if false.
    pub lock_cursor: bool,
    pub time_scale_on_enable: TimeScaleDirective,
    pub time_scale_on_disable: TimeScaleDirective,
}

impl StateDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn substate_of<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.substate_of.extend(parents.into_iter().map(Into::into));
        self
    }

    pub fn blocked_by<I, S>(mut self, blockers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_by.extend(blockers.into_iter().map(Into::into));
        self
    }

    pub fn do_not_override<I, S>(mut self, protected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.do_not_override.extend(protected.into_iter().map(Into::into));
        self
    }

    pub fn always_override<I, S>(mut self, forced: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.always_override.extend(forced.into_iter().map(Into::into));
        self
    }

    pub fn do_not_override_any(mut self, value: bool) -> Self {
        self.do_not_override_any = value;
        self
    }

    pub fn cant_override_by_default(mut self, value: bool) -> Self {
        self.cant_override_by_default = value;
        self
    }

    pub fn toggle(mut self, value: bool) -> Self {
        self.toggle = value;
        self
    }

    pub fn lock_cursor(mut self, value: bool) -> Self {
        self.lock_cursor = value;
        self
    }

    pub fn time_scale_on_enable(mut self, directive: TimeScaleDirective) -> Self {
        self.time_scale_on_enable = directive;
        self
    }

    pub fn time_scale_on_disable(mut self, directive: TimeScaleDirective) -> Self {
        self.time_scale_on_disable = directive;
        self
    }
}
