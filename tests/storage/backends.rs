//! Integration tests for record-store backends

use tabula_foundation::{Id, Record, Value, record};
use tabula_storage::{
    Backend, Branch, BranchConfig, Discipline, InPlaceBackend, Patch, PersistentBackend, SortSpec,
    backend_for,
};

fn authors(backend: &dyn Backend) -> Branch {
    [
        record! { "id" => 0, "name" => "Le Guin", "born" => 1929 },
        record! { "id" => 1, "name" => "Herbert", "born" => 1920 },
        record! { "id" => 2, "name" => "Butler", "born" => 1947 },
    ]
    .into_iter()
    .fold(backend.default_state(), |state, record| backend.insert(state, record))
}

fn names(backend: &dyn Backend, state: &Branch) -> Vec<String> {
    backend
        .materialize_all(state)
        .iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str).map(String::from))
        .collect()
}

// =============================================================================
// Copy-on-write
// =============================================================================

#[test]
fn copy_on_write_keeps_previous_snapshot() {
    let backend = PersistentBackend::new(BranchConfig::default());
    let before = authors(&backend);
    let patch = Patch::from(record! { "name" => "F. Herbert" });
    let after = backend.patch(before.clone(), &[Id::from(1)], &patch);

    assert_eq!(names(&backend, &before)[1], "Herbert");
    assert_eq!(names(&backend, &after)[1], "F. Herbert");
}

#[test]
fn copy_on_write_shares_untouched_records() {
    let backend = PersistentBackend::new(BranchConfig::default());
    let before = authors(&backend);
    let patch = Patch::from(record! { "born" => 1930 });
    let after = backend.patch(before.clone(), &[Id::from(0)], &patch);

    let old = backend.lookup(&before, &Id::from(2)).unwrap();
    let new = backend.lookup(&after, &Id::from(2)).unwrap();
    assert!(old.ptr_eq(new));
    let changed = backend.lookup(&after, &Id::from(0)).unwrap();
    assert!(!backend.lookup(&before, &Id::from(0)).unwrap().ptr_eq(changed));
}

#[test]
fn single_field_patch_updates_every_discipline() {
    let patch = Patch::from(record! { "born" => 1928 });
    for backend in [backend_for(BranchConfig::default()), backend_for(BranchConfig::in_place())] {
        let state = backend.patch(authors(backend.as_ref()), &[Id::from(2)], &patch);
        let butler = backend.lookup(&state, &Id::from(2)).unwrap();
        assert_eq!(butler.get("born"), Some(&Value::Int(1928)));
        assert_eq!(butler.get("name"), Some(&Value::from("Butler")));
        assert_eq!(butler.len(), 3);
    }
}

#[test]
fn unchanged_patch_returns_same_containers() {
    let backend = PersistentBackend::new(BranchConfig::default());
    let before = authors(&backend);
    let patch = Patch::from(record! { "born" => 1929 });
    let after = backend.patch(before.clone(), &[Id::from(0)], &patch);
    assert!(before.by_id().unwrap().ptr_eq(after.by_id().unwrap()));
}

// =============================================================================
// In-place
// =============================================================================

#[test]
fn in_place_backend_matches_copy_on_write() {
    let cow = PersistentBackend::new(BranchConfig::default());
    let inplace = InPlaceBackend::new(BranchConfig::in_place());

    let sort = SortSpec::by("born");
    let cow_state = cow.reorder(authors(&cow), &sort);
    let inplace_state = inplace.reorder(authors(&inplace), &sort);
    assert_eq!(names(&cow, &cow_state), names(&inplace, &inplace_state));
    assert_eq!(names(&cow, &cow_state), vec!["Herbert", "Le Guin", "Butler"]);
}

#[test]
fn flat_in_place_removes_found_record() {
    let backend = backend_for(BranchConfig::flat().with_discipline(Discipline::InPlace));
    let state = backend.remove(authors(backend.as_ref()), &[Id::from(1)]);
    assert_eq!(names(backend.as_ref(), &state), vec!["Le Guin", "Butler"]);

    let same = backend.remove(state, &[Id::from(42)]);
    assert_eq!(same.len(), 2);
}

// =============================================================================
// Forms
// =============================================================================

#[test]
fn flat_lookup_is_linear_but_equivalent() {
    for config in [BranchConfig::default(), BranchConfig::flat()] {
        let backend = backend_for(config);
        let state = authors(backend.as_ref());
        let found = backend.lookup(&state, &Id::from(2)).map(|r| r.get("name").cloned());
        assert_eq!(found, Some(Some(Value::from("Butler"))));
        assert!(backend.lookup(&state, &Id::from(9)).is_none());
    }
}

#[test]
fn descending_composite_sort() {
    let backend = backend_for(BranchConfig::default());
    let state = authors(backend.as_ref());
    let state = backend.insert(state, record! { "id" => 3, "name" => "Banks", "born" => 1954 });
    let state = backend.insert(state, record! { "id" => 4, "name" => "Atwood", "born" => 1939 });
    let sort = SortSpec::new()
        .then("born", tabula_storage::Direction::Desc)
        .then("name", tabula_storage::Direction::Asc);
    let state = backend.reorder(state, &sort);
    assert_eq!(
        names(backend.as_ref(), &state),
        vec!["Banks", "Butler", "Atwood", "Le Guin", "Herbert"]
    );
}

#[test]
fn materialized_records_carry_identifier() {
    let backend = backend_for(BranchConfig::default().with_id_attribute("key"));
    let state = backend.insert(backend.default_state(), record! { "key" => "a", "v" => 1 });
    let all = backend.materialize_all(&state);
    assert_eq!(all, vec![Record::new().with("key", "a").with("v", 1)]);
}
