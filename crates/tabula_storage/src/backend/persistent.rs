//! Copy-on-write backend.

use tabula_foundation::{Id, LtVec, Record};
use tracing::warn;

use super::{Backend, compare_records, id_set, record_id};
use crate::action::{Patch, SortSpec};
use crate::branch::Branch;
use crate::config::BranchConfig;

/// Backend that never writes through an existing container.
///
/// Every write produces new containers that share structure with the old
/// ones. Records a write does not touch keep their pointer identity, and a
/// write that changes nothing returns the state it was given.
#[derive(Clone, Debug, Default)]
pub struct PersistentBackend {
    config: BranchConfig,
}

impl PersistentBackend {
    /// Creates a copy-on-write backend.
    #[must_use]
    pub fn new(config: BranchConfig) -> Self {
        Self { config }
    }
}

impl Backend for PersistentBackend {
    fn config(&self) -> &BranchConfig {
        &self.config
    }

    fn insert(&self, state: Branch, record: Record) -> Branch {
        self.check_shape(&state);
        let attr = &*self.config.id_attribute;
        let Some(id) = record_id(&record, attr) else {
            warn!(target: "tabula::storage", field = attr, "dropping record without identifier");
            return state;
        };
        match state {
            Branch::Indexed { order, by_id } => {
                if by_id.contains_key(&id) {
                    warn!(target: "tabula::storage", %id, "insert replaces existing record");
                    Branch::Indexed {
                        order,
                        by_id: by_id.insert(id, record),
                    }
                } else {
                    Branch::Indexed {
                        order: order.push_back(id.clone()),
                        by_id: by_id.insert(id, record),
                    }
                }
            }
            Branch::Flat { items } => {
                let existing = items.position(|item| record_id(item, attr).as_ref() == Some(&id));
                match existing.and_then(|index| items.update(index, record.clone())) {
                    Some(replaced) => {
                        warn!(target: "tabula::storage", %id, "insert replaces existing record");
                        Branch::Flat { items: replaced }
                    }
                    None => Branch::Flat {
                        items: items.push_back(record),
                    },
                }
            }
        }
    }

    fn patch(&self, state: Branch, ids: &[Id], patch: &Patch) -> Branch {
        self.check_shape(&state);
        if ids.is_empty() || patch.is_empty() {
            return state;
        }
        let attr = &*self.config.id_attribute;
        match state {
            Branch::Indexed { order, by_id } => {
                // Starts as a clone of the input, so an untouched map stays ptr_eq.
                let mut next = by_id.clone();
                for id in ids {
                    let Some(current) = next.get(id) else {
                        continue;
                    };
                    let patched = patch.apply(current, attr);
                    if patched != *current {
                        next = next.insert(id.clone(), patched);
                    }
                }
                Branch::Indexed { order, by_id: next }
            }
            Branch::Flat { items } => {
                let mut next = items.clone();
                for id in ids {
                    let Some(index) =
                        next.position(|item| record_id(item, attr).as_ref() == Some(id))
                    else {
                        continue;
                    };
                    let Some(current) = next.get(index) else {
                        continue;
                    };
                    let patched = patch.apply(current, attr);
                    if patched != *current {
                        if let Some(updated) = next.update(index, patched) {
                            next = updated;
                        }
                    }
                }
                Branch::Flat { items: next }
            }
        }
    }

    fn reorder(&self, state: Branch, sort: &SortSpec) -> Branch {
        self.check_shape(&state);
        if sort.is_empty() {
            return state;
        }
        match state {
            Branch::Indexed { order, by_id } => {
                let mut sorted: Vec<Id> = order.iter().cloned().collect();
                sorted.sort_by(|a, b| compare_records(sort, by_id.get(a), by_id.get(b)));
                Branch::Indexed {
                    order: sorted.into_iter().collect(),
                    by_id,
                }
            }
            Branch::Flat { items } => {
                let mut sorted: Vec<Record> = items.iter().cloned().collect();
                sorted.sort_by(|a, b| sort.compare(a, b));
                Branch::Flat {
                    items: sorted.into_iter().collect(),
                }
            }
        }
    }

    fn remove(&self, state: Branch, ids: &[Id]) -> Branch {
        self.check_shape(&state);
        let doomed = id_set(ids);
        let attr = &*self.config.id_attribute;
        match state {
            Branch::Indexed { order, by_id } => {
                if !doomed.iter().any(|id| by_id.contains_key(*id)) {
                    return Branch::Indexed { order, by_id };
                }
                let by_id = doomed.iter().fold(by_id, |map, id| map.remove(*id));
                let order: LtVec<Id> = order.filtered(|id| !doomed.contains(id));
                Branch::Indexed { order, by_id }
            }
            Branch::Flat { items } => {
                let hit = |item: &Record| {
                    record_id(item, attr).is_some_and(|id| doomed.contains(&id))
                };
                if !items.iter().any(hit) {
                    return Branch::Flat { items };
                }
                Branch::Flat {
                    items: items.filtered(|item| !hit(item)),
                }
            }
        }
    }
}
