//! Schema resolution tests

use tabula_foundation::ErrorKind;
use tabula_model::{FieldKind, ModelDef, Relation, Schema};

use crate::library;

#[test]
fn library_field_tables() {
    let schema = library();
    assert_eq!(schema.len(), 5);

    let genre = schema.model("Genre").unwrap();
    assert!(matches!(genre.field("book_set").unwrap().kind, FieldKind::Reverse(_)));

    let book = schema.model("Book").unwrap();
    assert!(matches!(book.field("cover").unwrap().kind, FieldKind::Reverse(_)));
    assert!(book.field("genres").is_some_and(|f| !f.kind.is_stored()));
    assert!(book.field("author").is_some_and(|f| f.kind.is_stored()));

    let through = schema.model("BookGenres").unwrap();
    assert!(through.field("from_book_id").is_some());
    assert!(through.field("to_genre_id").is_some());
    assert!(through.through_for().is_some());
}

#[test]
fn unknown_model_is_an_error() {
    let err = library().model("Shelf").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownModel(_)));
}

#[test]
fn reverse_name_collision_is_rejected() {
    let err = Schema::builder()
        .with_model(ModelDef::new("Author").with_attribute("book_set"))
        .with_model(ModelDef::new("Book").with_relation("author", Relation::foreign_key("Author")))
        .build()
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Configuration(_)));
}

#[test]
fn explicit_through_name() {
    let schema = Schema::builder()
        .with_model(ModelDef::new("Tag"))
        .with_model(
            ModelDef::new("Post")
                .with_relation("tags", Relation::many_to_many("Tag").through("Tagging")),
        )
        .build()
        .unwrap();
    assert!(schema.model("Tagging").is_ok());
    assert!(schema.model("PostTags").is_err());
}
