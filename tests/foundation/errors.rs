//! Integration tests for Error types
//!
//! Tests error construction, display, context, and error kinds.

use tabula_foundation::{Error, ErrorContext, ErrorKind};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_unknown_model() {
    let err = Error::unknown_model("Shelf");
    assert!(matches!(err.kind, ErrorKind::UnknownModel(_)));
    assert!(format!("{err}").contains("Shelf"));
}

#[test]
fn error_unknown_field() {
    let err = Error::unknown_field("Book", "isbn");
    assert!(matches!(err.kind, ErrorKind::UnknownField { .. }));
    let msg = format!("{err}");
    assert!(msg.contains("Book"));
    assert!(msg.contains("isbn"));
}

#[test]
fn error_wrong_field_kind() {
    let err = Error::wrong_field_kind("Book", "title", "a to-one relation");
    assert_eq!(format!("{err}"), "Book.title is not a to-one relation");
}

#[test]
fn error_lookup_kinds() {
    assert!(Error::not_found("Book", "id = 7").is_not_found());
    assert!(!Error::ambiguous("Book", 2).is_not_found());
    assert!(!Error::invalid_mutation("nope").is_not_found());
}

#[test]
fn error_configuration_display() {
    let err = Error::configuration("duplicate model Book");
    assert_eq!(format!("{err}"), "configuration error: duplicate model Book");
}

// =============================================================================
// Error Context
// =============================================================================

#[test]
fn error_with_context() {
    let err = Error::invalid_mutation("identifier is immutable")
        .with_context(ErrorContext::new().with_model("Book").with_field("id"));
    let ctx = err.context.as_ref().unwrap();
    assert_eq!(ctx.model.as_deref(), Some("Book"));
    assert_eq!(ctx.field.as_deref(), Some("id"));
    assert_eq!(format!("{ctx}"), "in Book.id");
}

#[test]
fn context_frames() {
    let ctx = ErrorContext::new()
        .with_model("Book")
        .with_frame("create")
        .with_frame("many-to-many edit");
    let text = format!("{ctx}");
    assert!(text.contains("during create"));
    assert!(text.contains("during many-to-many edit"));
}
