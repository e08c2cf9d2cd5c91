//! Integration tests for persistent collections
//!
//! Tests LtVec and LtMap with structural sharing and immutability.

use tabula_foundation::Value;
use tabula_foundation::collections::{LtMap, LtVec};

// =============================================================================
// LtVec
// =============================================================================

#[test]
fn vector_empty() {
    let v: LtVec<Value> = LtVec::new();
    assert!(v.is_empty());
    assert_eq!(v.len(), 0);
    assert_eq!(v.first(), None);
}

#[test]
fn vector_push_back_is_persistent() {
    let v1 = LtVec::new().push_back(Value::Int(1));
    let v2 = v1.push_back(Value::Int(2));

    assert_eq!(v1.len(), 1);
    assert_eq!(v2.len(), 2);
    assert_eq!(v2.last(), Some(&Value::Int(2)));
}

#[test]
fn vector_update_out_of_bounds() {
    let v: LtVec<i64> = vec![1, 2].into_iter().collect();
    assert_eq!(v.update(5, 9), None);
    let updated = v.update(0, 9).unwrap();
    assert_eq!(updated.get(0), Some(&9));
    assert_eq!(v.get(0), Some(&1));
}

#[test]
fn vector_filtered_leaves_source() {
    let v: LtVec<i64> = (0..10).collect();
    let evens = v.filtered(|n| n % 2 == 0);
    assert_eq!(evens.len(), 5);
    assert_eq!(v.len(), 10);
}

#[test]
fn vector_sort_is_stable() {
    let mut v: LtVec<(i64, char)> =
        vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')].into_iter().collect();
    v.sort_by_mut(|a, b| a.0.cmp(&b.0));
    let order: Vec<char> = v.iter().map(|(_, c)| *c).collect();
    assert_eq!(order, vec!['b', 'd', 'a', 'c']);
}

#[test]
fn vector_position_and_contains() {
    let v: LtVec<&str> = vec!["a", "b", "c"].into_iter().collect();
    assert_eq!(v.position(|s| *s == "b"), Some(1));
    assert!(v.contains(&"c"));
    assert!(!v.contains(&"z"));
}

// =============================================================================
// LtMap
// =============================================================================

#[test]
fn map_insert_is_persistent() {
    let m1: LtMap<i64, &str> = LtMap::new().insert(1, "one");
    let m2 = m1.insert(2, "two");

    assert_eq!(m1.len(), 1);
    assert_eq!(m2.len(), 2);
    assert_eq!(m2.get(&2), Some(&"two"));
    assert!(!m1.contains_key(&2));
}

#[test]
fn map_remove() {
    let m: LtMap<i64, i64> = vec![(1, 10), (2, 20)].into_iter().collect();
    let smaller = m.remove(&1);
    assert_eq!(smaller.len(), 1);
    assert_eq!(m.len(), 2);

    let mut n = m.clone();
    assert_eq!(n.remove_mut(&2), Some(20));
    assert_eq!(n.remove_mut(&2), None);
}

#[test]
fn map_union_prefers_other() {
    let a: LtMap<&str, i64> = vec![("x", 1), ("y", 2)].into_iter().collect();
    let b: LtMap<&str, i64> = vec![("y", 20), ("z", 30)].into_iter().collect();
    let merged = a.union(&b);
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.get("y"), Some(&20));
}

#[test]
fn map_union_with_smaller_patch_overrides() {
    let record: LtMap<&str, i64> = ["a", "b", "c", "d", "e", "f", "g", "h"]
        .into_iter()
        .map(|key| (key, 0))
        .collect();
    let patch: LtMap<&str, i64> = vec![("c", 3)].into_iter().collect();
    let merged = record.union(&patch);
    assert_eq!(merged.len(), 8);
    assert_eq!(merged.get("c"), Some(&3));
    assert_eq!(merged.get("a"), Some(&0));
}

#[test]
fn map_clone_shares_storage() {
    let m: LtMap<i64, i64> = (0..100).map(|i| (i, i * i)).collect();
    let copy = m.clone();
    assert!(m.ptr_eq(&copy));

    let changed = copy.insert(0, -1);
    assert!(!m.ptr_eq(&changed));
    assert_eq!(m.get(&0), Some(&0));
}
