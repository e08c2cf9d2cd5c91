//! Relation bookkeeping tests: many-to-many edits, reverse reads, cascades

use tabula_foundation::{ErrorKind, Id, Value, record};
use tabula_model::{ModelDef, Relation, Schema, Session};
use tabula_storage::Action;

use crate::stocked;

fn ids(values: &[i64]) -> Vec<Id> {
    values.iter().copied().map(Id::from).collect()
}

// =============================================================================
// Many-to-many
// =============================================================================

#[test]
fn replacing_pairs_enqueues_one_add_and_one_remove() {
    let session = stocked();
    let books = session.model("Book").unwrap();
    let shelf = session.model("BookGenres").unwrap();
    let dune = books.with_id(12).unwrap();

    dune.set("genres", vec![1, 2, 3]).unwrap();
    session.next_state();
    assert_eq!(dune.related_set("genres").unwrap().ids(), ids(&[1, 2, 3]));

    dune.set("genres", vec![2, 3, 4]).unwrap();
    let pending = shelf.pending();
    assert_eq!(pending.len(), 2);
    let Action::Delete { ids: removed } = &pending[0] else {
        panic!("expected a delete first, got {:?}", pending[0]);
    };
    assert_eq!(removed.len(), 1);
    let Action::Create(added) = &pending[1] else {
        panic!("expected a create second, got {:?}", pending[1]);
    };
    assert_eq!(added.get("from_book_id"), Some(&Value::Int(12)));
    assert_eq!(added.get("to_genre_id"), Some(&Value::Int(4)));

    session.next_state();
    assert_eq!(dune.get("genres").unwrap(), Value::from(vec![2, 3, 4]));
}

#[test]
fn add_and_remove_skip_redundant_pairs() {
    let session = stocked();
    let genres = session.model("Book").unwrap().with_id(10).unwrap().related_set("genres").unwrap();

    genres.add([1, 4]).unwrap();
    genres.remove([2]).unwrap();
    assert_eq!(session.model("BookGenres").unwrap().pending().len(), 1);

    session.next_state();
    assert_eq!(genres.ids(), ids(&[1, 3, 4]));
}

#[test]
fn edits_in_one_batch_compose() {
    let session = stocked();
    let genres = session.model("Book").unwrap().with_id(12).unwrap().related_set("genres").unwrap();

    genres.remove([1]).unwrap();
    genres.add([1]).unwrap();
    genres.add([2]).unwrap();
    genres.add([2]).unwrap();
    session.next_state();

    assert_eq!(genres.ids(), ids(&[1, 2]));
    assert_eq!(session.model("BookGenres").unwrap().count(), 5);
}

#[test]
fn reverse_side_edits_use_same_rows() {
    let session = stocked();
    let essay = session.model("Genre").unwrap().with_id(4).unwrap();
    let books = essay.related_set("book_set").unwrap();
    assert_eq!(books.count(), 0);

    books.add([12]).unwrap();
    session.next_state();

    assert_eq!(books.ids(), ids(&[12]));
    let dune = session.model("Book").unwrap().with_id(12).unwrap();
    assert_eq!(dune.get("genres").unwrap(), Value::from(vec![1, 4]));
    assert_eq!(essay.get("book_set").unwrap(), Value::from(vec![12]));
}

#[test]
fn clear_removes_every_pair() {
    let session = stocked();
    let book = session.model("Book").unwrap().with_id(10).unwrap();
    book.related_set("genres").unwrap().clear().unwrap();
    session.next_state();
    assert!(!book.related_set("genres").unwrap().exists());
}

#[test]
fn non_relation_views_reject_pair_edits() {
    let session = stocked();
    let err = session.model("Genre").unwrap().all().add([1]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidMutation(_)));
}

#[test]
fn many_to_many_assignment_needs_a_list() {
    let session = stocked();
    let dune = session.model("Book").unwrap().with_id(12).unwrap();
    let err = dune.set("genres", 3).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidMutation(_)));
    assert_eq!(session.pending(), 0);
}

// =============================================================================
// Reverse reads
// =============================================================================

#[test]
fn reverse_foreign_key_lists_referencing_books() {
    let session = stocked();
    let le_guin = session.model("Author").unwrap().with_id(0).unwrap();
    assert_eq!(le_guin.related_set("book_set").unwrap().ids(), ids(&[10, 11]));
    assert_eq!(le_guin.get("book_set").unwrap(), Value::from(vec![10, 11]));
}

#[test]
fn one_to_one_both_directions() {
    let session = stocked();
    let covers = session.model("Cover").unwrap();
    let books = session.model("Book").unwrap();
    assert_eq!(books.with_id(12).unwrap().get("cover").unwrap(), Value::Nil);

    let cover = covers.create(record! { "color" => "orange", "book" => 12 }).unwrap();
    session.next_state();

    let dune = books.with_id(12).unwrap();
    assert_eq!(dune.get("cover").unwrap(), Value::from(&cover));
    let found = dune.related("cover").unwrap().unwrap();
    assert_eq!(found.get("color").unwrap(), Value::from("orange"));
    assert_eq!(found.related("book").unwrap().unwrap().id(), &Id::from(12));
}

// =============================================================================
// Delete cascades
// =============================================================================

#[test]
fn deleting_author_nullifies_references() {
    let session = stocked();
    let books = session.model("Book").unwrap();
    session.model("Author").unwrap().with_id(0).unwrap().delete().unwrap();
    session.next_state();

    assert!(!session.model("Author").unwrap().exists(0));
    for id in [10, 11] {
        assert_eq!(books.with_id(id).unwrap().get("author").unwrap(), Value::Nil);
    }
    assert_eq!(books.with_id(12).unwrap().get("author").unwrap(), Value::Int(1));
}

#[test]
fn deleting_genre_removes_its_pairs() {
    let session = stocked();
    let shelf = session.model("BookGenres").unwrap();
    assert_eq!(shelf.count(), 4);

    session.model("Genre").unwrap().with_id(1).unwrap().delete().unwrap();
    session.next_state();

    assert_eq!(shelf.count(), 2);
    let dispossessed = session.model("Book").unwrap().with_id(10).unwrap();
    assert_eq!(dispossessed.get("genres").unwrap(), Value::from(vec![3]));
}

#[test]
fn deleting_book_removes_pairs_and_cover_reference() {
    let session = stocked();
    let cover = session.model("Cover").unwrap().create(record! { "book" => 10 }).unwrap();
    session.next_state();

    session.model("Book").unwrap().filter(record! { "author" => 0 }).delete().unwrap();
    session.next_state();

    let shelf = session.model("BookGenres").unwrap();
    assert_eq!(shelf.count(), 1);
    let cover = session.model("Cover").unwrap().with_id(cover).unwrap();
    assert_eq!(cover.get("book").unwrap(), Value::Nil);
}

#[test]
fn self_relation_cascades_on_both_sides() {
    let schema = Schema::builder()
        .with_model(
            ModelDef::new("Person")
                .with_attribute("name")
                .with_relation(
                    "friends",
                    Relation::many_to_many("Person").with_related_name("friended_by"),
                ),
        )
        .build()
        .unwrap();
    let session = Session::new(schema);
    let people = session.model("Person").unwrap();
    people.create(record! { "name" => "a" }).unwrap();
    people.create(record! { "name" => "b", "friends" => vec![0] }).unwrap();
    people.create(record! { "name" => "c", "friends" => vec![0, 1] }).unwrap();
    session.next_state();

    let a = people.with_id(0).unwrap();
    assert_eq!(a.get("friended_by").unwrap(), Value::from(vec![1, 2]));
    assert_eq!(a.get("friends").unwrap(), Value::from(Vec::<i64>::new()));

    people.with_id(1).unwrap().delete().unwrap();
    session.next_state();

    let rows = session.model("PersonFriends").unwrap();
    assert_eq!(rows.count(), 1);
    let row = rows.all().as_plain().first().unwrap();
    assert_eq!(row.get("from_person_id"), Some(&Value::Int(2)));
    assert_eq!(row.get("to_person_id"), Some(&Value::Int(0)));
}
