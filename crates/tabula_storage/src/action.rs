//! Actions: the unit of change applied to a branch.
//!
//! Mutations never write to a branch directly. They are described as
//! [`Action`]s, queued, and later folded over the current state in order.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use tabula_foundation::{FieldName, Id, Record, Value};

/// A queued change to one store.
#[derive(Clone, Debug)]
pub enum Action {
    /// Insert a record at the end of the order.
    Create(Record),
    /// Patch the records with the given identifiers.
    Update {
        /// Target identifiers.
        ids: Vec<Id>,
        /// Change to apply to each target.
        patch: Patch,
    },
    /// Remove the records with the given identifiers.
    Delete {
        /// Target identifiers.
        ids: Vec<Id>,
    },
    /// Reorder the branch.
    Order(SortSpec),
}

impl Action {
    /// Creates an update action.
    #[must_use]
    pub fn update(ids: impl IntoIterator<Item = Id>, patch: impl Into<Patch>) -> Self {
        Self::Update {
            ids: ids.into_iter().collect(),
            patch: patch.into(),
        }
    }

    /// Creates a delete action.
    #[must_use]
    pub fn delete(ids: impl IntoIterator<Item = Id>) -> Self {
        Self::Delete {
            ids: ids.into_iter().collect(),
        }
    }

    /// Returns the kind of this action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Create(_) => ActionKind::Create,
            Self::Update { .. } => ActionKind::Update,
            Self::Delete { .. } => ActionKind::Delete,
            Self::Order(_) => ActionKind::Order,
        }
    }
}

/// Discriminant of an [`Action`], used in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// [`Action::Create`].
    Create,
    /// [`Action::Update`].
    Update,
    /// [`Action::Delete`].
    Delete,
    /// [`Action::Order`].
    Order,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Order => "ORDER",
        };
        f.write_str(name)
    }
}

/// Function form of a patch.
pub type PatchFn = Arc<dyn Fn(&Record) -> Record + Send + Sync>;

/// A change applied to a single record.
#[derive(Clone)]
pub enum Patch {
    /// Shallow merge: every field here overrides the target's.
    Fields(Record),
    /// Compute the replacement from the current record.
    With(PatchFn),
}

impl Patch {
    /// Creates a function patch.
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&Record) -> Record + Send + Sync + 'static,
    {
        Self::With(Arc::new(f))
    }

    /// Returns the patched record.
    ///
    /// The identifier field is never changed by a patch, whatever the patch
    /// contains.
    #[must_use]
    pub fn apply(&self, current: &Record, id_attribute: &str) -> Record {
        let next = match self {
            Self::Fields(fields) => current.merge(fields),
            Self::With(f) => f(current),
        };
        match (current.get(id_attribute), next.get(id_attribute)) {
            (Some(before), Some(after)) if before == after => next,
            (Some(before), _) => next.set(id_attribute, before.clone()),
            (None, Some(_)) => next.without(id_attribute),
            (None, None) => next,
        }
    }

    /// Returns true if this patch provably changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Fields(fields) if fields.is_empty())
    }
}

impl fmt::Debug for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fields(fields) => f.debug_tuple("Fields").field(fields).finish(),
            Self::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

impl From<Record> for Patch {
    fn from(fields: Record) -> Self {
        Self::Fields(fields)
    }
}

/// Function form of a sort key.
pub type KeyFn = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// One component of a sort.
#[derive(Clone)]
pub enum SortKey {
    /// Sort by a field's value; a missing field sorts as nil.
    Field(FieldName),
    /// Sort by a computed value.
    With(KeyFn),
}

impl SortKey {
    /// Creates a computed sort key.
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        Self::With(Arc::new(f))
    }

    /// Extracts this key from a record.
    #[must_use]
    pub fn extract(&self, record: &Record) -> Value {
        match self {
            Self::Field(name) => record.get(name).cloned().unwrap_or_default(),
            Self::With(f) => f(record),
        }
    }
}

impl fmt::Debug for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

impl From<&str> for SortKey {
    fn from(name: &str) -> Self {
        Self::Field(name.into())
    }
}

impl From<FieldName> for SortKey {
    fn from(name: FieldName) -> Self {
        Self::Field(name)
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// Composite sort: keys are compared in order until one differs.
#[derive(Clone, Debug, Default)]
pub struct SortSpec {
    keys: Vec<(SortKey, Direction)>,
}

impl SortSpec {
    /// Creates an empty sort, which leaves order unchanged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an ascending sort on one key.
    #[must_use]
    pub fn by(key: impl Into<SortKey>) -> Self {
        Self::new().then(key, Direction::Asc)
    }

    /// Creates a descending sort on one key.
    #[must_use]
    pub fn by_desc(key: impl Into<SortKey>) -> Self {
        Self::new().then(key, Direction::Desc)
    }

    /// Builder method to append a tie-breaking key.
    #[must_use]
    pub fn then(mut self, key: impl Into<SortKey>, direction: Direction) -> Self {
        self.keys.push((key.into(), direction));
        self
    }

    /// Returns the keys in priority order.
    #[must_use]
    pub fn keys(&self) -> &[(SortKey, Direction)] {
        &self.keys
    }

    /// Returns true if there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Compares two records under this sort.
    #[must_use]
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for (key, direction) in &self.keys {
            let ord = key.extract(a).total_cmp(&key.extract(b));
            let ord = match direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl From<&str> for SortSpec {
    fn from(field: &str) -> Self {
        Self::by(field)
    }
}

impl From<SortKey> for SortSpec {
    fn from(key: SortKey) -> Self {
        Self::by(key)
    }
}
