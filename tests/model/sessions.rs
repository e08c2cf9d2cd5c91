//! Session, fold, and state tests

use tabula_foundation::{Id, Value, record};
use tabula_model::{Database, Session};
use tabula_storage::{Branch, BranchConfig, Discipline};

use crate::{library, stocked};

#[test]
fn creates_fold_into_documented_shape() {
    let session = Session::new(library());
    let authors = session.model("Author").unwrap();
    assert_eq!(authors.state(), Some(Branch::indexed()));

    authors.create(record! { "name" => "A" }).unwrap();
    authors.create(record! { "name" => "B" }).unwrap();
    let branch = authors.next_state();

    let order: Vec<Id> = branch.order().unwrap().iter().cloned().collect();
    assert_eq!(order, vec![Id::from(0), Id::from(1)]);
    let by_id = branch.by_id().unwrap();
    assert_eq!(by_id.get(&Id::from(0)), Some(&record! { "id" => 0, "name" => "A" }));
    assert_eq!(by_id.get(&Id::from(1)), Some(&record! { "id" => 1, "name" => "B" }));
}

#[test]
fn update_leaves_other_records_pointer_equal() {
    let session = Session::new(library());
    let authors = session.model("Author").unwrap();
    authors.create(record! { "name" => "A" }).unwrap();
    authors.create(record! { "name" => "B" }).unwrap();
    let before = authors.next_state();

    authors.update([0], record! { "name" => "C" }).unwrap();
    let after = authors.next_state();

    let old = before.by_id().unwrap();
    let new = after.by_id().unwrap();
    assert_eq!(new.get(&Id::from(0)).unwrap().get("name"), Some(&Value::from("C")));
    assert!(old.get(&Id::from(1)).unwrap().ptr_eq(new.get(&Id::from(1)).unwrap()));
}

#[test]
fn folding_twice_without_actions_is_stable() {
    let session = stocked();
    let once = session.next_state();
    let twice = session.next_state();
    assert_eq!(once, twice);
    assert_eq!(session.pending(), 0);
}

#[test]
fn undefined_state_folds_to_default() {
    let session = Session::with_state(library(), Database::new());
    let authors = session.model("Author").unwrap();
    assert_eq!(authors.state(), None);
    assert_eq!(authors.count(), 0);

    authors.create(record! { "name" => "lost" }).unwrap();
    let db = session.next_state();
    assert_eq!(db.get("Author"), Some(&Branch::indexed()));
    assert_eq!(authors.count(), 0);
}

#[test]
fn dropping_a_session_leaves_state_untouched() {
    let schema = library();
    let session = Session::new(schema.clone());
    session.model("Author").unwrap().create(record! { "name" => "A" }).unwrap();
    let db = session.next_state();

    {
        let scratch = Session::with_state(schema.clone(), db.clone());
        scratch.model("Author").unwrap().create(record! { "name" => "B" }).unwrap();
        assert_eq!(scratch.pending(), 1);
    }

    let session = Session::with_state(schema, db);
    assert_eq!(session.model("Author").unwrap().count(), 1);
}

#[test]
fn order_then_create_appends() {
    let session = stocked();
    let books = session.model("Book").unwrap();
    books.order_by("year");
    books.create(record! { "id" => 13, "title" => "Kindred", "year" => 1979 }).unwrap();
    session.next_state();
    assert_eq!(books.all().ids(), vec![Id::from(12), Id::from(11), Id::from(10), Id::from(13)]);
}

#[test]
fn auto_ids_skip_explicit_ones_in_same_batch() {
    let session = Session::new(library());
    let authors = session.model("Author").unwrap();
    authors.create(record! { "name" => "A" }).unwrap();
    authors.create(record! { "id" => 5, "name" => "B" }).unwrap();
    let next = authors.create(record! { "name" => "C" }).unwrap();
    assert_eq!(next, Id::from(6));
    session.next_state();

    let after_fold = authors.create(record! { "name" => "D" }).unwrap();
    assert_eq!(after_fold, Id::from(7));
}

#[test]
fn in_place_discipline_behaves_the_same() {
    let schema = tabula_model::Schema::builder()
        .with_default_config(BranchConfig::default().with_discipline(Discipline::InPlace))
        .with_model(tabula_model::ModelDef::new("Author").with_attribute("name"))
        .build()
        .unwrap();
    let session = Session::new(schema);
    let authors = session.model("Author").unwrap();
    authors.create(record! { "name" => "A" }).unwrap();
    authors.create(record! { "name" => "B" }).unwrap();
    session.next_state();
    authors.with_id(0).unwrap().delete().unwrap();
    session.next_state();
    assert_eq!(authors.all().ids(), vec![Id::from(1)]);
}

#[test]
fn flat_stores_serve_lookups() {
    let schema = tabula_model::Schema::builder()
        .with_default_config(BranchConfig::flat())
        .with_model(tabula_model::ModelDef::new("Author").with_attribute("name"))
        .build()
        .unwrap();
    let session = Session::new(schema);
    let authors = session.model("Author").unwrap();
    authors.create(record! { "id" => "ug", "name" => "Le Guin" }).unwrap();
    session.next_state();
    assert!(authors.state().is_some_and(|b| !b.is_indexed()));
    assert_eq!(authors.with_id("ug").unwrap().get("name").unwrap(), Value::from("Le Guin"));
}
