//! Persisted branch layout.
//!
//! A branch is written as a map using the key names from its
//! [`BranchConfig`]:
//!
//! - indexed form: `{ <items_key>: [id, ...], <by_id_key>: { id: record, ... } }`
//! - flat form: `{ <items_key>: [record, ...] }`
//!
//! No other top-level keys are written or accepted. Decoding needs the
//! configuration, so it goes through [`BranchSeed`] rather than a plain
//! `Deserialize` impl.

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, DeserializeSeed, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserializer, Serialize, Serializer};
use tabula_foundation::{Error, ErrorKind, Id, LtMap, LtVec, Record, Result};

use crate::branch::Branch;
use crate::config::BranchConfig;

/// Serializable view of a branch under a configuration.
#[derive(Clone, Copy, Debug)]
pub struct BranchLayout<'a> {
    /// The branch to write.
    pub branch: &'a Branch,
    /// Supplies the key names.
    pub config: &'a BranchConfig,
}

impl<'a> BranchLayout<'a> {
    /// Creates a layout view.
    #[must_use]
    pub const fn new(branch: &'a Branch, config: &'a BranchConfig) -> Self {
        Self { branch, config }
    }
}

/// Index entries written in display order, so output is deterministic.
struct OrderedIndex<'a> {
    order: &'a LtVec<Id>,
    by_id: &'a LtMap<Id, Record>,
}

impl Serialize for OrderedIndex<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.order
                .iter()
                .filter_map(|id| self.by_id.get(id).map(|record| (id, record))),
        )
    }
}

impl Serialize for BranchLayout<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.branch {
            Branch::Indexed { order, by_id } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(&*self.config.items_key, order)?;
                map.serialize_entry(&*self.config.by_id_key, &OrderedIndex { order, by_id })?;
                map.end()
            }
            Branch::Flat { items } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(&*self.config.items_key, items)?;
                map.end()
            }
        }
    }
}

/// Decodes a branch in the form and key names of a configuration.
#[derive(Clone, Copy, Debug)]
pub struct BranchSeed<'a> {
    config: &'a BranchConfig,
}

impl<'a> BranchSeed<'a> {
    /// Creates a seed for a configuration.
    #[must_use]
    pub const fn new(config: &'a BranchConfig) -> Self {
        Self { config }
    }
}

impl<'de> DeserializeSeed<'de> for BranchSeed<'_> {
    type Value = Branch;

    fn deserialize<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Branch, D::Error> {
        deserializer.deserialize_map(BranchVisitor { config: self.config })
    }
}

struct BranchVisitor<'a> {
    config: &'a BranchConfig,
}

impl<'de> Visitor<'de> for BranchVisitor<'_> {
    type Value = Branch;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.config.indexed {
            write!(
                formatter,
                "a map with keys {:?} and {:?}",
                self.config.items_key, self.config.by_id_key
            )
        } else {
            write!(formatter, "a map with key {:?}", self.config.items_key)
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Branch, A::Error> {
        let config = self.config;
        let mut order: Option<Vec<Id>> = None;
        let mut by_id: Option<LtMap<Id, Record>> = None;
        let mut items: Option<LtVec<Record>> = None;

        while let Some(key) = map.next_key::<String>()? {
            if *key == *config.items_key {
                let seen = if config.indexed {
                    order.replace(map.next_value()?).is_some()
                } else {
                    items.replace(map.next_value()?).is_some()
                };
                if seen {
                    return Err(de::Error::custom(format!("duplicate key {key:?}")));
                }
            } else if config.indexed && *key == *config.by_id_key {
                if by_id.replace(map.next_value()?).is_some() {
                    return Err(de::Error::custom(format!("duplicate key {key:?}")));
                }
            } else {
                return Err(de::Error::custom(format!("unknown key {key:?}")));
            }
        }

        if !config.indexed {
            let items = items.ok_or_else(|| missing::<A::Error>(&config.items_key))?;
            return Ok(Branch::Flat { items });
        }

        let order = order.ok_or_else(|| missing::<A::Error>(&config.items_key))?;
        let by_id = by_id.ok_or_else(|| missing::<A::Error>(&config.by_id_key))?;
        let unique: HashSet<&Id> = order.iter().collect();
        if unique.len() != order.len() {
            return Err(de::Error::custom("duplicate identifier in order"));
        }
        if order.len() != by_id.len() || !order.iter().all(|id| by_id.contains_key(id)) {
            return Err(de::Error::custom("order and index hold different identifiers"));
        }
        Ok(Branch::Indexed {
            order: order.into_iter().collect(),
            by_id,
        })
    }
}

fn missing<E: de::Error>(key: &str) -> E {
    E::custom(format!("missing key {key:?}"))
}

/// Encodes a branch as `MessagePack`.
///
/// # Errors
///
/// Returns a serialization error if encoding fails.
pub fn encode(branch: &Branch, config: &BranchConfig) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(&BranchLayout::new(branch, config))
        .map_err(|e| Error::new(ErrorKind::Serialization(e.to_string())))
}

/// Decodes a branch from `MessagePack`.
///
/// # Errors
///
/// Returns a serialization error if the bytes are not a valid layout for
/// `config`.
pub fn decode(bytes: &[u8], config: &BranchConfig) -> Result<Branch> {
    let mut deserializer = rmp_serde::Deserializer::new(bytes);
    BranchSeed::new(config)
        .deserialize(&mut deserializer)
        .map_err(|e| Error::new(ErrorKind::Serialization(e.to_string())))
}
