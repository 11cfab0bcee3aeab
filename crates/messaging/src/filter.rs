use std::fmt::Debug;

use crate::event::Event;
use crate::scope::Scope;

/// Whether a filter is being installed or withdrawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterAction {
    /// Install the filter.
    Add,
    /// Withdraw a previously installed filter.
    Remove,
}

/// Predicate over events, installed on ports with [`crate::Port::filter_notify`].
///
/// Events reach an observer only if every installed filter matches.
pub trait Filter: Debug + Send + Sync + 'static {
    /// Whether `event` passes.
    fn matches(&self, event: &Event) -> bool;

    /// The scope this filter restricts to, if it is a scope filter.
    ///
    /// Transports use this to route notifications.
    fn scope(&self) -> Option<&Scope> {
        None
    }
}

/// Passes events on the filter scope or below it.
///
/// An exact filter passes events on the filter scope only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeFilter {
    scope: Scope,
    exact: bool,
}

impl ScopeFilter {
    /// Creates the filter.
    #[must_use]
    pub const fn new(scope: Scope) -> Self {
        Self { scope, exact: false }
    }

    /// Creates a filter rejecting sub-scopes.
    #[must_use]
    pub const fn exact(scope: Scope) -> Self {
        Self { scope, exact: true }
    }

    /// Whether sub-scopes are rejected.
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        self.exact
    }
}

impl Filter for ScopeFilter {
    fn matches(&self, event: &Event) -> bool {
        if self.exact {
            event.scope == self.scope
        } else {
            event.scope.is_covered_by(&self.scope)
        }
    }

    fn scope(&self) -> Option<&Scope> {
        Some(&self.scope)
    }
}

/// Passes events whose method tag equals the filter method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodFilter {
    method: String,
}

impl MethodFilter {
    /// Creates the filter.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
        }
    }
}

impl Filter for MethodFilter {
    fn matches(&self, event: &Event) -> bool {
        event.has_method(&self.method)
    }
}
