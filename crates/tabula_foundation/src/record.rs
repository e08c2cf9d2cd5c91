//! Records: field-name to value mappings.
//!
//! A [`Record`] is the stored shape of one entity. It is a persistent map, so
//! cloning is O(1) and unchanged records can be recognised by pointer identity
//! with [`Record::ptr_eq`].

use std::fmt;
use std::sync::Arc;

use crate::collections::LtMap;
use crate::value::Value;

/// Field name.
pub type FieldName = Arc<str>;

/// Persistent mapping from field name to value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Record(LtMap<FieldName, Value>);

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self(LtMap::new())
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns true if the record has the field.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Builder method: returns the record with the field set.
    #[must_use]
    pub fn with(self, field: impl Into<FieldName>, value: impl Into<Value>) -> Self {
        self.set(field, value)
    }

    /// Returns a new record with the field set.
    #[must_use]
    pub fn set(&self, field: impl Into<FieldName>, value: impl Into<Value>) -> Self {
        Self(self.0.insert(field.into(), value.into()))
    }

    /// Sets a field in place, returning the previous value.
    pub fn set_mut(
        &mut self,
        field: impl Into<FieldName>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        self.0.insert_mut(field.into(), value.into())
    }

    /// Returns a new record without the field.
    #[must_use]
    pub fn without(&self, field: &str) -> Self {
        Self(self.0.remove(field))
    }

    /// Removes a field in place, returning its value.
    pub fn remove_mut(&mut self, field: &str) -> Option<Value> {
        self.0.remove_mut(field)
    }

    /// Returns a shallow merge: every field of `patch` overrides this record.
    #[must_use]
    pub fn merge(&self, patch: &Record) -> Self {
        if patch.is_empty() {
            return self.clone();
        }
        Self(self.0.union(&patch.0))
    }

    /// Merges `patch` into this record in place.
    pub fn merge_mut(&mut self, patch: &Record) {
        for (field, value) in patch.iter() {
            if self.get(field) != Some(value) {
                self.0.insert_mut(Arc::clone(field), value.clone());
            }
        }
    }

    /// Returns true if every field of `pattern` is present here with an equal value.
    #[must_use]
    pub fn matches(&self, pattern: &Record) -> bool {
        pattern
            .iter()
            .all(|(field, expected)| self.get(field) == Some(expected))
    }

    /// Returns an iterator over `(field, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &Value)> {
        self.0.iter()
    }

    /// Returns the field names, sorted.
    #[must_use]
    pub fn fields(&self) -> Vec<FieldName> {
        let mut names: Vec<FieldName> = self.0.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns true if both records share the same underlying storage.
    ///
    /// Backends preserve pointer identity for records they did not touch,
    /// which lets consumers skip unchanged regions without comparing values.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sorted for stable output; the underlying map is unordered.
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        f.debug_map().entries(entries).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<FieldName>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}

/// Builds a [`Record`] from `field => value` pairs.
///
/// ```
/// use tabula_foundation::{record, Value};
///
/// let book = record! { "id" => 1, "title" => "Dune" };
/// assert_eq!(book.get("title"), Some(&Value::from("Dune")));
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($field:expr => $value:expr),+ $(,)?) => {
        $crate::Record::new()$(.with($field, $value))+
    };
}

#[cfg(feature = "serde")]
mod serde_support {
    use super::{FieldName, Record};
    use crate::collections::LtMap;
    use crate::value::Value;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Record {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            self.0.serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for Record {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            LtMap::<FieldName, Value>::deserialize(deserializer).map(Record)
        }
    }
}
