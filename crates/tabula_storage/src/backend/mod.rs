//! Record-store backends.
//!
//! A [`Backend`] owns the physical representation of one model's branch and
//! knows how to apply each kind of [`Action`] to it. Two implementations
//! share the trait:
//!
//! - [`PersistentBackend`] builds new containers for every write, so any
//!   earlier snapshot stays valid and untouched records keep their identity.
//! - [`InPlaceBackend`] writes through the containers it is handed.
//!
//! Both take the branch by value and return the next branch. A branch whose
//! form (indexed or flat) disagrees with the store configuration is a
//! programming error and panics.

mod in_place;
mod persistent;

use std::collections::HashSet;
use std::fmt;

use tabula_foundation::{Id, Record, Value};

use crate::action::{Action, Patch, SortSpec};
use crate::branch::Branch;
use crate::config::{BranchConfig, Discipline};

pub use in_place::InPlaceBackend;
pub use persistent::PersistentBackend;

/// Applies actions to a branch.
pub trait Backend: fmt::Debug {
    /// Returns the store configuration.
    fn config(&self) -> &BranchConfig;

    /// Appends a record at the end of the order.
    ///
    /// A record whose identifier is already present replaces the stored
    /// record without moving it.
    fn insert(&self, state: Branch, record: Record) -> Branch;

    /// Applies `patch` to every listed record.
    ///
    /// Records whose patched value equals the current one are left alone.
    /// If nothing changes, the state is returned as given.
    fn patch(&self, state: Branch, ids: &[Id], patch: &Patch) -> Branch;

    /// Stable-sorts the branch.
    fn reorder(&self, state: Branch, sort: &SortSpec) -> Branch;

    /// Removes every listed record.
    fn remove(&self, state: Branch, ids: &[Id]) -> Branch;

    /// Returns an empty branch in the configured form.
    fn default_state(&self) -> Branch {
        if self.config().indexed {
            Branch::indexed()
        } else {
            Branch::flat()
        }
    }

    /// Looks up one record.
    fn lookup<'b>(&self, state: &'b Branch, id: &Id) -> Option<&'b Record> {
        self.check_shape(state);
        match state {
            Branch::Indexed { by_id, .. } => by_id.get(id),
            Branch::Flat { items } => {
                let wanted = Value::from(id);
                let attr = &*self.config().id_attribute;
                items.iter().find(|record| record.get(attr) == Some(&wanted))
            }
        }
    }

    /// Returns every record in order, each carrying its identifier field.
    fn materialize_all(&self, state: &Branch) -> Vec<Record> {
        self.check_shape(state);
        let attr = &self.config().id_attribute;
        match state {
            Branch::Indexed { order, by_id } => order
                .iter()
                .filter_map(|id| {
                    by_id.get(id).map(|record| {
                        if record.contains(attr) {
                            record.clone()
                        } else {
                            record.set(attr.clone(), id)
                        }
                    })
                })
                .collect(),
            Branch::Flat { items } => items.iter().cloned().collect(),
        }
    }

    /// Returns the identifiers in order.
    fn ids(&self, state: &Branch) -> Vec<Id> {
        self.check_shape(state);
        state.ids(&self.config().id_attribute)
    }

    /// Applies one action.
    fn apply(&self, state: Branch, action: &Action) -> Branch {
        match action {
            Action::Create(record) => self.insert(state, record.clone()),
            Action::Update { ids, patch } => self.patch(state, ids, patch),
            Action::Delete { ids } => self.remove(state, ids),
            Action::Order(sort) => self.reorder(state, sort),
        }
    }

    /// Panics if the branch form disagrees with the configuration.
    fn check_shape(&self, state: &Branch) {
        assert_eq!(
            state.is_indexed(),
            self.config().indexed,
            "branch representation does not match store configuration"
        );
    }
}

/// Creates the backend for a configuration's discipline.
#[must_use]
pub fn backend_for(config: BranchConfig) -> Box<dyn Backend> {
    match config.discipline {
        Discipline::CopyOnWrite => Box::new(PersistentBackend::new(config)),
        Discipline::InPlace => Box::new(InPlaceBackend::new(config)),
    }
}

/// Reads a record's identifier field.
pub(crate) fn record_id(record: &Record, id_attribute: &str) -> Option<Id> {
    record.get(id_attribute).and_then(Value::as_id)
}

/// Collects identifiers into a set for membership tests.
pub(crate) fn id_set(ids: &[Id]) -> HashSet<&Id> {
    ids.iter().collect()
}

/// Compares two stored records, treating a missing record as empty.
pub(crate) fn compare_records(
    sort: &SortSpec,
    a: Option<&Record>,
    b: Option<&Record>,
) -> std::cmp::Ordering {
    let empty = Record::new();
    sort.compare(a.unwrap_or(&empty), b.unwrap_or(&empty))
}
