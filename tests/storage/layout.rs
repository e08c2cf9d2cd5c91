//! Integration tests for the persisted branch layout

use std::collections::BTreeMap;

use serde::Deserialize;
use tabula_foundation::{Value, record};
use tabula_storage::layout::{decode, encode};
use tabula_storage::{Action, Branch, BranchConfig, backend_for, fold};

#[derive(Debug, Deserialize)]
struct IndexedShape {
    items: Vec<i64>,
    #[serde(rename = "itemsById")]
    items_by_id: BTreeMap<i64, BTreeMap<String, Value>>,
}

fn two_names(config: &BranchConfig) -> Branch {
    let backend = backend_for(config.clone());
    fold(
        backend.as_ref(),
        Some(backend.default_state()),
        &[
            Action::Create(record! { "id" => 0, "name" => "A" }),
            Action::Create(record! { "id" => 1, "name" => "B" }),
        ],
    )
}

#[test]
fn indexed_layout_shape() {
    let config = BranchConfig::default();
    let bytes = encode(&two_names(&config), &config).unwrap();
    let shape: IndexedShape = rmp_serde::from_slice(&bytes).unwrap();

    assert_eq!(shape.items, vec![0, 1]);
    assert_eq!(shape.items_by_id.len(), 2);
    assert_eq!(shape.items_by_id[&0]["name"], Value::from("A"));
    assert_eq!(shape.items_by_id[&1]["id"], Value::Int(1));
}

#[test]
fn empty_default_state_layout() {
    let config = BranchConfig::default();
    let backend = backend_for(config.clone());
    let bytes = encode(&backend.default_state(), &config).unwrap();
    let shape: IndexedShape = rmp_serde::from_slice(&bytes).unwrap();
    assert!(shape.items.is_empty());
    assert!(shape.items_by_id.is_empty());
}

#[test]
fn decode_restores_branch() {
    for config in [BranchConfig::default(), BranchConfig::flat()] {
        let branch = two_names(&config);
        let decoded = decode(&encode(&branch, &config).unwrap(), &config).unwrap();
        assert_eq!(decoded, branch);
    }
}

#[test]
fn decode_rejects_other_form() {
    let indexed = BranchConfig::default();
    let bytes = encode(&two_names(&indexed), &indexed).unwrap();
    assert!(decode(&bytes, &BranchConfig::flat()).is_err());
}

#[test]
fn custom_keys_are_used() {
    let config = BranchConfig::default().with_keys("order", "rows");
    let bytes = encode(&two_names(&config), &config).unwrap();
    let keys: BTreeMap<String, serde::de::IgnoredAny> = rmp_serde::from_slice(&bytes).unwrap();
    assert_eq!(keys.keys().map(String::as_str).collect::<Vec<_>>(), vec!["order", "rows"]);
    assert!(decode(&bytes, &BranchConfig::default()).is_err());
}
