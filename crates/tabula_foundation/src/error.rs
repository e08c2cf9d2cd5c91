//! Error types for the Tabula system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//!
//! Only recoverable or configuration failures are represented here. A branch
//! whose shape does not match its store configuration is a programming error
//! and panics instead.

use std::fmt;

use thiserror::Error;

/// The main error type for Tabula operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration(message.into()))
    }

    /// Creates an unknown model error.
    #[must_use]
    pub fn unknown_model(model: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownModel(model.into()))
    }

    /// Creates an unknown field error.
    #[must_use]
    pub fn unknown_field(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownField {
            model: model.into(),
            field: field.into(),
        })
    }

    /// Creates an error for a field used in a way its kind does not support.
    #[must_use]
    pub fn wrong_field_kind(
        model: impl Into<String>,
        field: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::new(ErrorKind::WrongFieldKind {
            model: model.into(),
            field: field.into(),
            expected,
        })
    }

    /// Creates a lookup-not-found error.
    #[must_use]
    pub fn not_found(model: impl Into<String>, lookup: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound {
            model: model.into(),
            lookup: lookup.into(),
        })
    }

    /// Creates an ambiguous lookup error.
    #[must_use]
    pub fn ambiguous(model: impl Into<String>, matches: usize) -> Self {
        Self::new(ErrorKind::Ambiguous {
            model: model.into(),
            matches,
        })
    }

    /// Creates an invalid mutation error.
    #[must_use]
    pub fn invalid_mutation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidMutation(message.into()))
    }

    /// Creates an error for a store with no integer identifiers left.
    #[must_use]
    pub fn ids_exhausted() -> Self {
        Self::new(ErrorKind::IdsExhausted)
    }

    /// Returns true if this is a lookup that matched nothing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound { .. })
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Schema or store configuration is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Model name is not registered in the schema.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// Field is not declared on the model.
    #[error("unknown field: {field} on model {model}")]
    UnknownField {
        /// The model that was queried.
        model: String,
        /// The field name that was not found.
        field: String,
    },

    /// Field exists but does not support the requested access.
    #[error("{model}.{field} is not {expected}")]
    WrongFieldKind {
        /// The model that was queried.
        model: String,
        /// The field that was accessed.
        field: String,
        /// What the access needed, e.g. "a forward relation".
        expected: &'static str,
    },

    /// Lookup matched no entity.
    #[error("{model} not found: {lookup}")]
    NotFound {
        /// The model that was queried.
        model: String,
        /// Description of the identifier or pattern that was looked up.
        lookup: String,
    },

    /// Lookup expected one entity but matched several.
    #[error("ambiguous lookup on {model}: {matches} entities matched")]
    Ambiguous {
        /// The model that was queried.
        model: String,
        /// How many entities matched.
        matches: usize,
    },

    /// Mutation input rejected at the call site.
    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    /// Every integer identifier up to `i64::MAX` is taken.
    #[error("identifier space exhausted")]
    IdsExhausted,

    /// Persisted branch layout could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Model the operation targeted.
    pub model: Option<String>,
    /// Field the operation targeted.
    pub field: Option<String>,
    /// Chain of operations that led to the error, outermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Adds an operation frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(model) = &self.model {
            write!(f, "in {model}")?;
            if let Some(field) = &self.field {
                write!(f, ".{field}")?;
            }
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  during {frame}")?;
            }
        }
        Ok(())
    }
}
