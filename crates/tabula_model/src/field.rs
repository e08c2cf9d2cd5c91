//! Field descriptors.
//!
//! A model declares attributes and [`Relation`]s. When the schema is built,
//! each declaration is resolved into a [`Field`] whose [`FieldKind`] says how
//! the field is read and written. Relations are resolved into a shared
//! [`Link`] that both ends point at: the forward field on the declaring
//! model and the reverse field on the target.

use std::fmt;
use std::sync::Arc;

use tabula_foundation::FieldName;

/// Model name.
pub type ModelName = Arc<str>;

/// A relation as declared on the source model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Relation {
    /// Many sources reference one target.
    ForeignKey {
        /// Target model.
        to: ModelName,
        /// Reverse accessor name on the target, if not derived.
        related_name: Option<FieldName>,
    },
    /// At most one source per target.
    OneToOne {
        /// Target model.
        to: ModelName,
        /// Reverse accessor name on the target, if not derived.
        related_name: Option<FieldName>,
    },
    /// Pairs of sources and targets, stored in an auxiliary model.
    ManyToMany {
        /// Target model.
        to: ModelName,
        /// Reverse accessor name on the target, if not derived.
        related_name: Option<FieldName>,
        /// Auxiliary model name, if not derived.
        through: Option<ModelName>,
    },
}

impl Relation {
    /// Declares a foreign key to `to`.
    #[must_use]
    pub fn foreign_key(to: impl Into<ModelName>) -> Self {
        Self::ForeignKey {
            to: to.into(),
            related_name: None,
        }
    }

    /// Declares a one-to-one relation to `to`.
    #[must_use]
    pub fn one_to_one(to: impl Into<ModelName>) -> Self {
        Self::OneToOne {
            to: to.into(),
            related_name: None,
        }
    }

    /// Declares a many-to-many relation to `to`.
    #[must_use]
    pub fn many_to_many(to: impl Into<ModelName>) -> Self {
        Self::ManyToMany {
            to: to.into(),
            related_name: None,
            through: None,
        }
    }

    /// Overrides the reverse accessor name.
    #[must_use]
    pub fn with_related_name(mut self, name: impl Into<FieldName>) -> Self {
        match &mut self {
            Self::ForeignKey { related_name, .. }
            | Self::OneToOne { related_name, .. }
            | Self::ManyToMany { related_name, .. } => *related_name = Some(name.into()),
        }
        self
    }

    /// Overrides the auxiliary model name of a many-to-many relation.
    ///
    /// Has no effect on other relations.
    #[must_use]
    pub fn through(mut self, name: impl Into<ModelName>) -> Self {
        if let Self::ManyToMany { through, .. } = &mut self {
            *through = Some(name.into());
        }
        self
    }

    /// Returns the target model.
    #[must_use]
    pub fn target(&self) -> &ModelName {
        match self {
            Self::ForeignKey { to, .. }
            | Self::OneToOne { to, .. }
            | Self::ManyToMany { to, .. } => to,
        }
    }

    /// Returns the kind of relation.
    #[must_use]
    pub const fn kind(&self) -> RelationKind {
        match self {
            Self::ForeignKey { .. } => RelationKind::ForeignKey,
            Self::OneToOne { .. } => RelationKind::OneToOne,
            Self::ManyToMany { .. } => RelationKind::ManyToMany,
        }
    }

    pub(crate) fn related_name(&self) -> Option<&FieldName> {
        match self {
            Self::ForeignKey { related_name, .. }
            | Self::OneToOne { related_name, .. }
            | Self::ManyToMany { related_name, .. } => related_name.as_ref(),
        }
    }

    pub(crate) fn through_name(&self) -> Option<&ModelName> {
        match self {
            Self::ManyToMany { through, .. } => through.as_ref(),
            Self::ForeignKey { .. } | Self::OneToOne { .. } => None,
        }
    }
}

/// Relation cardinality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Many-to-one.
    ForeignKey,
    /// One-to-one.
    OneToOne,
    /// Many-to-many.
    ManyToMany,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignKey => write!(f, "foreign key"),
            Self::OneToOne => write!(f, "one-to-one"),
            Self::ManyToMany => write!(f, "many-to-many"),
        }
    }
}

/// Auxiliary model backing a many-to-many relation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Through {
    /// Auxiliary model name.
    pub model: ModelName,
    /// Column holding the source identifier.
    pub source_column: FieldName,
    /// Column holding the target identifier.
    pub target_column: FieldName,
}

/// A resolved relation, shared by its forward and reverse fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    /// Relation cardinality.
    pub kind: RelationKind,
    /// Declaring model.
    pub source: ModelName,
    /// Forward field on the declaring model.
    pub field: FieldName,
    /// Target model.
    pub target: ModelName,
    /// Reverse field on the target model.
    pub related_name: FieldName,
    /// Auxiliary model (many-to-many only).
    pub through: Option<Through>,
}

/// How a field is stored and accessed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// The identifier field. Stored; immutable after creation.
    Identifier,
    /// A plain stored value.
    Attribute,
    /// Stored reference to one target.
    ForeignKey(Arc<Link>),
    /// Stored reference to one target, unique per target.
    OneToOne(Arc<Link>),
    /// Virtual; pairs live in the auxiliary model.
    ManyToMany(Arc<Link>),
    /// Virtual accessor on the target of a relation.
    Reverse(Arc<Link>),
}

impl FieldKind {
    /// Returns true for fields kept in the stored record.
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        matches!(
            self,
            Self::Identifier | Self::Attribute | Self::ForeignKey(_) | Self::OneToOne(_)
        )
    }

    /// Returns the relation this field belongs to, if any.
    #[must_use]
    pub fn link(&self) -> Option<&Arc<Link>> {
        match self {
            Self::Identifier | Self::Attribute => None,
            Self::ForeignKey(link)
            | Self::OneToOne(link)
            | Self::ManyToMany(link)
            | Self::Reverse(link) => Some(link),
        }
    }
}

/// A resolved field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    /// Field name.
    pub name: FieldName,
    /// How the field is stored and accessed.
    pub kind: FieldKind,
}

impl Field {
    pub(crate) fn new(name: impl Into<FieldName>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Converts `BookGenre` or `HTTPRequest` to `book_genre` or `http_request`.
pub(crate) fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) => p.is_uppercase() && next.is_some_and(|n| n.is_lowercase()),
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Converts `related_books` to `RelatedBooks`.
pub(crate) fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}
