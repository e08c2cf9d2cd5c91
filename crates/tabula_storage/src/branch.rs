//! Branch state: the slice of the database owned by one model.
//!
//! Branches are built from persistent collections, so cloning one is O(1)
//! and a clone taken before a write keeps observing the old contents.

use tabula_foundation::{Id, LtMap, LtVec, Record, Value};

/// State of one model's store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Branch {
    /// Ordered identifiers plus an id-to-record index.
    ///
    /// `order` holds exactly the keys of `by_id`, without duplicates.
    Indexed {
        /// Identifiers in display order.
        order: LtVec<Id>,
        /// Records by identifier.
        by_id: LtMap<Id, Record>,
    },
    /// Records in display order with no secondary index.
    Flat {
        /// Records in display order.
        items: LtVec<Record>,
    },
}

impl Branch {
    /// Creates an empty indexed branch.
    #[must_use]
    pub fn indexed() -> Self {
        Self::Indexed {
            order: LtVec::new(),
            by_id: LtMap::new(),
        }
    }

    /// Creates an empty flat branch.
    #[must_use]
    pub fn flat() -> Self {
        Self::Flat {
            items: LtVec::new(),
        }
    }

    /// Returns true for the indexed form.
    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed { .. })
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Indexed { order, .. } => order.len(),
            Self::Flat { items } => items.len(),
        }
    }

    /// Returns true if the branch holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the ordered identifiers (indexed form only).
    #[must_use]
    pub fn order(&self) -> Option<&LtVec<Id>> {
        match self {
            Self::Indexed { order, .. } => Some(order),
            Self::Flat { .. } => None,
        }
    }

    /// Returns the id-to-record index (indexed form only).
    #[must_use]
    pub fn by_id(&self) -> Option<&LtMap<Id, Record>> {
        match self {
            Self::Indexed { by_id, .. } => Some(by_id),
            Self::Flat { .. } => None,
        }
    }

    /// Returns the record list (flat form only).
    #[must_use]
    pub fn items(&self) -> Option<&LtVec<Record>> {
        match self {
            Self::Indexed { .. } => None,
            Self::Flat { items } => Some(items),
        }
    }

    /// Returns the identifiers in display order.
    ///
    /// Flat records without a usable identifier field are skipped.
    #[must_use]
    pub fn ids(&self, id_attribute: &str) -> Vec<Id> {
        match self {
            Self::Indexed { order, .. } => order.iter().cloned().collect(),
            Self::Flat { items } => items
                .iter()
                .filter_map(|record| record.get(id_attribute).and_then(Value::as_id))
                .collect(),
        }
    }
}
