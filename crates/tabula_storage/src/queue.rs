//! Pending actions and the fold that applies them.

use tracing::{debug, trace};

use crate::action::Action;
use crate::backend::Backend;
use crate::branch::Branch;

/// Ordered actions waiting to be applied to one store.
#[derive(Clone, Debug, Default)]
pub struct UpdateQueue {
    actions: Vec<Action>,
}

impl UpdateQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action.
    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Returns the number of pending actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the pending actions in order.
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    /// Returns the pending actions as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Action] {
        &self.actions
    }

    /// Discards every pending action.
    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Removes and returns every pending action.
    pub fn take(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }
}

impl Extend<Action> for UpdateQueue {
    fn extend<I: IntoIterator<Item = Action>>(&mut self, iter: I) {
        self.actions.extend(iter);
    }
}

/// Folds `actions` over `state` from left to right.
///
/// An undefined state (`None`) yields the backend's default state, and the
/// actions are discarded.
#[must_use]
pub fn fold(backend: &dyn Backend, state: Option<Branch>, actions: &[Action]) -> Branch {
    let Some(state) = state else {
        debug!(
            target: "tabula::storage",
            discarded = actions.len(),
            "undefined state, starting from default"
        );
        return backend.default_state();
    };
    if actions.is_empty() {
        return state;
    }
    debug!(target: "tabula::storage", actions = actions.len(), "folding update queue");
    actions.iter().fold(state, |state, action| {
        trace!(target: "tabula::storage", kind = %action.kind(), "applying action");
        backend.apply(state, action)
    })
}
