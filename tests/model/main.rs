//! Integration tests for Layer 2: Model
//!
//! Tests for schemas, sessions, entity handles, query sets, and relation
//! bookkeeping, over a small library schema.

mod entities;
mod relations;
mod schema;
mod sessions;

use std::sync::Arc;

use tabula_model::{ModelDef, Relation, Schema, Session};

/// Authors write books; books have genres and at most one cover.
pub fn library() -> Arc<Schema> {
    Schema::builder()
        .with_model(ModelDef::new("Author").with_attribute("name"))
        .with_model(ModelDef::new("Genre").with_attribute("name"))
        .with_model(
            ModelDef::new("Book")
                .with_attribute("title")
                .with_attribute("year")
                .with_relation("author", Relation::foreign_key("Author"))
                .with_relation("genres", Relation::many_to_many("Genre")),
        )
        .with_model(
            ModelDef::new("Cover")
                .with_attribute("color")
                .with_relation("book", Relation::one_to_one("Book")),
        )
        .build()
        .unwrap()
}

/// A folded session holding two authors, four genres, and three books.
pub fn stocked() -> Session {
    use tabula_foundation::record;

    let session = Session::new(library());
    let authors = session.model("Author").unwrap();
    let genres = session.model("Genre").unwrap();
    let books = session.model("Book").unwrap();

    authors.create(record! { "name" => "Le Guin" }).unwrap();
    authors.create(record! { "name" => "Herbert" }).unwrap();
    for (id, name) in [(1, "scifi"), (2, "fantasy"), (3, "classic"), (4, "essay")] {
        genres.create(record! { "id" => id, "name" => name }).unwrap();
    }
    books
        .create(record! {
            "id" => 10, "title" => "The Dispossessed", "year" => 1974, "author" => 0,
            "genres" => vec![1, 3],
        })
        .unwrap();
    books
        .create(record! {
            "id" => 11, "title" => "A Wizard of Earthsea", "year" => 1968, "author" => 0,
            "genres" => vec![2],
        })
        .unwrap();
    books
        .create(record! {
            "id" => 12,
            "title" => "Dune",
            "year" => 1965,
            "author" => 1,
            "genres" => vec![1],
        })
        .unwrap();
    session.next_state();
    session
}
