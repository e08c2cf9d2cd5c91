//! In-place backend.

use tabula_foundation::{Id, Record};
use tracing::warn;

use super::{Backend, compare_records, record_id};
use crate::action::{Patch, SortSpec};
use crate::branch::Branch;
use crate::config::BranchConfig;

/// Backend that writes through the containers it is handed.
///
/// The persistent collections still copy any node shared with another
/// snapshot before writing to it, so a clone taken earlier is never
/// disturbed.
#[derive(Clone, Debug, Default)]
pub struct InPlaceBackend {
    config: BranchConfig,
}

impl InPlaceBackend {
    /// Creates an in-place backend.
    #[must_use]
    pub fn new(config: BranchConfig) -> Self {
        Self { config }
    }

    fn patch_record(&self, record: &mut Record, patch: &Patch) {
        let attr = &*self.config.id_attribute;
        match patch {
            Patch::Fields(fields) if fields.contains(attr) => {
                record.merge_mut(&fields.without(attr));
            }
            Patch::Fields(fields) => record.merge_mut(fields),
            Patch::With(_) => {
                let patched = patch.apply(record, attr);
                if patched != *record {
                    *record = patched;
                }
            }
        }
    }
}

impl Backend for InPlaceBackend {
    fn config(&self) -> &BranchConfig {
        &self.config
    }

    fn insert(&self, mut state: Branch, record: Record) -> Branch {
        self.check_shape(&state);
        let attr = &*self.config.id_attribute;
        let Some(id) = record_id(&record, attr) else {
            warn!(target: "tabula::storage", field = attr, "dropping record without identifier");
            return state;
        };
        match &mut state {
            Branch::Indexed { order, by_id } => {
                if by_id.insert_mut(id.clone(), record).is_some() {
                    warn!(target: "tabula::storage", %id, "insert replaces existing record");
                } else {
                    order.push_back_mut(id);
                }
            }
            Branch::Flat { items } => {
                match items.position(|item| record_id(item, attr).as_ref() == Some(&id)) {
                    Some(index) => {
                        warn!(target: "tabula::storage", %id, "insert replaces existing record");
                        if let Some(slot) = items.get_mut(index) {
                            *slot = record;
                        }
                    }
                    None => items.push_back_mut(record),
                }
            }
        }
        state
    }

    fn patch(&self, mut state: Branch, ids: &[Id], patch: &Patch) -> Branch {
        self.check_shape(&state);
        if patch.is_empty() {
            return state;
        }
        let attr = &*self.config.id_attribute;
        match &mut state {
            Branch::Indexed { by_id, .. } => {
                for id in ids {
                    if let Some(record) = by_id.get_mut(id) {
                        self.patch_record(record, patch);
                    }
                }
            }
            Branch::Flat { items } => {
                for id in ids {
                    let found = items.position(|item| record_id(item, attr).as_ref() == Some(id));
                    if let Some(record) = found.and_then(|index| items.get_mut(index)) {
                        self.patch_record(record, patch);
                    }
                }
            }
        }
        state
    }

    fn reorder(&self, mut state: Branch, sort: &SortSpec) -> Branch {
        self.check_shape(&state);
        if sort.is_empty() {
            return state;
        }
        match &mut state {
            Branch::Indexed { order, by_id } => {
                order.sort_by_mut(|a, b| compare_records(sort, by_id.get(a), by_id.get(b)));
            }
            Branch::Flat { items } => items.sort_by_mut(|a, b| sort.compare(a, b)),
        }
        state
    }

    fn remove(&self, mut state: Branch, ids: &[Id]) -> Branch {
        self.check_shape(&state);
        let attr = &*self.config.id_attribute;
        match &mut state {
            Branch::Indexed { order, by_id } => {
                for id in ids {
                    if by_id.remove_mut(id).is_some() {
                        if let Some(index) = order.position(|candidate| candidate == id) {
                            order.remove_mut(index);
                        }
                    }
                }
            }
            Branch::Flat { items } => {
                for id in ids {
                    if let Some(index) =
                        items.position(|item| record_id(item, attr).as_ref() == Some(id))
                    {
                        items.remove_mut(index);
                    }
                }
            }
        }
        state
    }
}
