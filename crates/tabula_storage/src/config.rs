//! Store configuration.
//!
//! A [`BranchConfig`] is fixed when a store is created. It decides the shape of
//! the branch (indexed or flat), the names used when the branch is persisted,
//! and which backend applies actions to it.

use std::sync::Arc;

use tabula_foundation::{Error, FieldName, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a backend writes new state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Discipline {
    /// Build new containers for every write; earlier snapshots stay valid.
    #[default]
    CopyOnWrite,
    /// Write through the existing containers.
    InPlace,
}

/// Configuration for one model's branch.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BranchConfig {
    /// Name of the identifier field.
    pub id_attribute: FieldName,
    /// Whether an id-to-record index is maintained (indexed form) or records
    /// are kept in a single list (flat form).
    pub indexed: bool,
    /// Persisted key of the ordered identifier list (indexed form) or of the
    /// record list (flat form).
    pub items_key: Arc<str>,
    /// Persisted key of the id-to-record index. Unused in flat form.
    pub by_id_key: Arc<str>,
    /// Update discipline.
    pub discipline: Discipline,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            id_attribute: "id".into(),
            indexed: true,
            items_key: "items".into(),
            by_id_key: "itemsById".into(),
            discipline: Discipline::CopyOnWrite,
        }
    }
}

impl BranchConfig {
    /// Creates a configuration for a flat (non-indexed) branch.
    #[must_use]
    pub fn flat() -> Self {
        Self {
            indexed: false,
            ..Self::default()
        }
    }

    /// Creates a configuration using the in-place discipline.
    #[must_use]
    pub fn in_place() -> Self {
        Self {
            discipline: Discipline::InPlace,
            ..Self::default()
        }
    }

    /// Builder method to set the identifier field name.
    #[must_use]
    pub fn with_id_attribute(mut self, name: impl Into<FieldName>) -> Self {
        self.id_attribute = name.into();
        self
    }

    /// Builder method to choose indexed or flat form.
    #[must_use]
    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    /// Builder method to set the persisted key names.
    #[must_use]
    pub fn with_keys(
        mut self,
        items_key: impl Into<Arc<str>>,
        by_id_key: impl Into<Arc<str>>,
    ) -> Self {
        self.items_key = items_key.into();
        self.by_id_key = by_id_key.into();
        self
    }

    /// Builder method to set the update discipline.
    #[must_use]
    pub fn with_discipline(mut self, discipline: Discipline) -> Self {
        self.discipline = discipline;
        self
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a name is empty or, in indexed form,
    /// if both persisted keys are the same.
    pub fn validate(&self) -> Result<()> {
        if self.id_attribute.is_empty() {
            return Err(Error::configuration("identifier field name is empty"));
        }
        if self.items_key.is_empty() {
            return Err(Error::configuration("items key is empty"));
        }
        if self.indexed {
            if self.by_id_key.is_empty() {
                return Err(Error::configuration("by-id key is empty"));
            }
            if self.items_key == self.by_id_key {
                return Err(Error::configuration(format!(
                    "items key and by-id key are both {:?}",
                    self.items_key
                )));
            }
        }
        Ok(())
    }
}
