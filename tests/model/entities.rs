//! Entity handle tests

use tabula_foundation::{ErrorKind, Id, Value, record};
use tabula_model::Session;

use crate::{library, stocked};

#[test]
fn create_then_with_id_round_trips_fields() {
    let session = Session::new(library());
    let authors = session.model("Author").unwrap();
    let fields = record! { "id" => 7, "name" => "Butler" };
    authors.create(fields.clone()).unwrap();
    session.next_state();
    assert_eq!(authors.with_id(7).unwrap().to_plain(), fields);
}

#[test]
fn reads_before_fold_see_old_value() {
    let session = stocked();
    let books = session.model("Book").unwrap();
    let dune = books.with_id(12).unwrap();

    dune.set("title", "Dune Messiah").unwrap();
    assert_eq!(dune.get("title").unwrap(), Value::from("Dune"));
    assert_eq!(books.with_id(12).unwrap().get("title").unwrap(), Value::from("Dune"));

    session.next_state();
    assert_eq!(dune.get("title").unwrap(), Value::from("Dune"));
    assert_eq!(dune.refresh().unwrap().get("title").unwrap(), Value::from("Dune Messiah"));
    assert_eq!(books.with_id(12).unwrap().get("title").unwrap(), Value::from("Dune Messiah"));
}

#[test]
fn nil_identifier_is_rejected() {
    let session = Session::new(library());
    let err = session
        .model("Author")
        .unwrap()
        .create(record! { "id" => Value::Nil, "name" => "X" })
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidMutation(_)));
    assert_eq!(session.pending(), 0);
}

#[test]
fn identifier_cannot_change() {
    let session = stocked();
    let dune = session.model("Book").unwrap().with_id(12).unwrap();

    let err = dune.set("id", 99).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidMutation(_)));

    dune.update(&record! { "id" => 12, "year" => 1966 }).unwrap();
    session.next_state();
    assert_eq!(dune.refresh().unwrap().get("year").unwrap(), Value::Int(1966));
}

#[test]
fn reverse_and_unknown_fields_are_rejected() {
    let session = stocked();
    let author = session.model("Author").unwrap().with_id(0).unwrap();

    let err = author.set("book_set", vec![12]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidMutation(_)));

    let err = author.set("birthday", 1929).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownField { .. }));

    let err = session.model("Author").unwrap().create(record! { "nickname" => "U" }).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownField { .. }));
    assert_eq!(session.pending(), 0);
}

#[test]
fn foreign_key_accepts_entities_and_nil() {
    let session = stocked();
    let books = session.model("Book").unwrap();
    let herbert = session.model("Author").unwrap().with_id(1).unwrap();

    books.with_id(11).unwrap().set("author", &herbert).unwrap();
    books.with_id(10).unwrap().set("author", Value::Nil).unwrap();
    session.next_state();

    assert_eq!(books.with_id(11).unwrap().get("author").unwrap(), Value::Int(1));
    assert!(books.with_id(10).unwrap().related("author").unwrap().is_none());

    let err = books.with_id(12).unwrap().set("author", 1.5).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidMutation(_)));
}

#[test]
fn related_follows_foreign_key() {
    let session = stocked();
    let dune = session.model("Book").unwrap().with_id(12).unwrap();
    let author = dune.related("author").unwrap().unwrap();
    assert_eq!(author.id(), &Id::from(1));
    assert_eq!(author.model(), "Author");
    assert_eq!(author.get("name").unwrap(), Value::from("Herbert"));
}

#[test]
fn related_rejects_to_many_fields() {
    let session = stocked();
    let dune = session.model("Book").unwrap().with_id(12).unwrap();
    let err = dune.related("genres").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::WrongFieldKind { .. }));
    let err = dune.related_set("title").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::WrongFieldKind { .. }));
}

#[test]
fn upsert_updates_or_creates() {
    let session = stocked();
    let authors = session.model("Author").unwrap();
    authors.upsert(record! { "id" => 1, "name" => "Frank Herbert" }).unwrap();
    authors.upsert(record! { "id" => 2, "name" => "Butler" }).unwrap();
    session.next_state();

    assert_eq!(authors.with_id(1).unwrap().get("name").unwrap(), Value::from("Frank Herbert"));
    assert_eq!(authors.count(), 3);
}

#[test]
fn with_id_reports_missing() {
    let session = stocked();
    let err = session.model("Author").unwrap().with_id(42).unwrap_err();
    assert!(err.is_not_found());
    assert!(format!("{err}").contains("42"));
    assert!(!session.model("Author").unwrap().exists(42));
}
