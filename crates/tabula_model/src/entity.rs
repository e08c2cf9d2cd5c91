//! Entity handles.

use std::fmt;

use tabula_foundation::{Error, Id, Record, Result, Value};
use tabula_storage::{Action, Patch};

use crate::field::{Field, FieldKind, RelationKind};
use crate::query::{Lookup, QuerySet, Scope};
use crate::relations::{self, ManyLink, Side};
use crate::schema::ModelSchema;
use crate::session::Session;

/// One entity, bound to the session it was read from.
///
/// Stored fields are read from a snapshot taken when the handle was built.
/// The snapshot never aliases the branch, so a handle keeps reporting the
/// values it was read with until [`refresh`](Self::refresh) is called.
/// Writes enqueue actions and do not change the snapshot.
#[derive(Clone)]
pub struct Entity<'s> {
    session: &'s Session,
    model: &'s ModelSchema,
    id: Id,
    snapshot: Record,
}

impl<'s> Entity<'s> {
    pub(crate) fn new(
        session: &'s Session,
        model: &'s ModelSchema,
        id: Id,
        snapshot: Record,
    ) -> Self {
        Self {
            session,
            model,
            id,
            snapshot,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &'s str {
        self.model.name()
    }

    /// Returns the model schema.
    #[must_use]
    pub fn schema(&self) -> &'s ModelSchema {
        self.model
    }

    /// Returns the snapshot's stored fields.
    #[must_use]
    pub fn to_plain(&self) -> Record {
        self.snapshot.clone()
    }

    /// Re-reads the entity from the current folded state.
    ///
    /// # Errors
    ///
    /// Returns not-found if the entity no longer exists.
    pub fn refresh(&self) -> Result<Self> {
        self.session
            .lookup(self.model, &self.id)
            .map(|record| Self::new(self.session, self.model, self.id.clone(), record))
            .ok_or_else(|| {
                Error::not_found(
                    self.model.name(),
                    format!("{} = {}", self.model.id_attribute(), self.id),
                )
            })
    }

    /// Reads a field.
    ///
    /// Stored fields come from the snapshot; a stored field missing from it
    /// reads as nil. Many-to-many and reverse foreign-key fields read as a
    /// list of identifiers, and a reverse one-to-one as one identifier or
    /// nil, all computed from the current folded state.
    ///
    /// # Errors
    ///
    /// Returns an unknown-field error.
    pub fn get(&self, field: &str) -> Result<Value> {
        let field = self.model.require_field(field)?;
        match &field.kind {
            FieldKind::Identifier => Ok(Value::from(&self.id)),
            FieldKind::Attribute | FieldKind::ForeignKey(_) | FieldKind::OneToOne(_) => {
                Ok(self.snapshot.get(&field.name).cloned().unwrap_or(Value::Nil))
            }
            FieldKind::ManyToMany(_) => Ok(Value::from(self.related_set(&field.name)?.ids())),
            FieldKind::Reverse(link) if link.kind == RelationKind::OneToOne => {
                Ok(self.related(&field.name)?.map_or(Value::Nil, |entity| Value::from(entity.id())))
            }
            FieldKind::Reverse(_) => Ok(Value::from(self.related_set(&field.name)?.ids())),
        }
    }

    /// Assigns one field.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub fn set(&self, field: &str, value: impl Into<Value>) -> Result<()> {
        self.update(&Record::new().with(field, value))
    }

    /// Assigns several fields.
    ///
    /// Stored fields are enqueued as one update. A list assigned to a
    /// many-to-many field replaces the related set. An identifier field equal
    /// to the current identifier is ignored. Nothing is enqueued if any
    /// field is rejected.
    ///
    /// # Errors
    ///
    /// Returns an unknown-field error, or an invalid-mutation error for the
    /// identifier, a reverse field, or a value of the wrong shape.
    pub fn update(&self, fields: &Record) -> Result<()> {
        let mut stored = Record::new();
        let mut replacements = Vec::new();
        for (name, value) in fields.iter() {
            let field = self.model.require_field(name)?;
            match &field.kind {
                FieldKind::Identifier if value.as_id().as_ref() == Some(&self.id) => {}
                FieldKind::ManyToMany(link) => {
                    let ids = relations::to_ids(self.model, name, value)?;
                    replacements.push((ManyLink::new(link, Side::Forward, self.id.clone())?, ids));
                }
                _ => {
                    let value = relations::stored_value(self.model, field, value.clone())?;
                    stored.set_mut(name.clone(), value);
                }
            }
        }

        if !stored.is_empty() {
            self.session
                .enqueue(self.model, Action::update(vec![self.id.clone()], Patch::from(stored)));
        }
        for (link, ids) in replacements {
            link.replace(self.session, &ids)?;
        }
        Ok(())
    }

    /// Enqueues deletion of this entity, after its cascade.
    ///
    /// # Errors
    ///
    /// Returns an error if an auxiliary model cannot be resolved.
    pub fn delete(&self) -> Result<()> {
        let ids = [self.id.clone()];
        relations::cascade(self.session, self.model, &ids)?;
        self.session.enqueue(self.model, Action::delete(ids.to_vec()));
        Ok(())
    }

    fn relation_field(&self, name: &str) -> Result<&'s Field> {
        self.model.require_field(name)
    }

    /// Follows a to-one relation.
    ///
    /// Forward foreign keys and one-to-one fields follow the stored
    /// reference. A reverse one-to-one finds the single referencing entity.
    /// A dangling reference reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns an unknown-field error, or a wrong-field-kind error if the
    /// field is not a to-one relation.
    pub fn related(&self, field: &str) -> Result<Option<Entity<'s>>> {
        let field = self.relation_field(field)?;
        let schema = self.session.schema();
        match &field.kind {
            FieldKind::ForeignKey(link) | FieldKind::OneToOne(link) => {
                let Some(target_id) = self.snapshot.get(&field.name).and_then(Value::as_id) else {
                    return Ok(None);
                };
                let target = schema.model(&link.target)?;
                Ok(self
                    .session
                    .lookup(target, &target_id)
                    .map(|record| Entity::new(self.session, target, target_id, record)))
            }
            FieldKind::Reverse(link) if link.kind == RelationKind::OneToOne => {
                let source = schema.model(&link.source)?;
                let pattern = Record::new().with(link.field.clone(), &self.id);
                Ok(QuerySet::new(self.session, source, Scope::All)
                    .filter(pattern)
                    .first())
            }
            _ => Err(Error::wrong_field_kind(self.model.name(), &*field.name, "a to-one relation")),
        }
    }

    /// Returns the entities on the other end of a to-many relation.
    ///
    /// # Errors
    ///
    /// Returns an unknown-field error, or a wrong-field-kind error if the
    /// field is not a many-to-many or reverse foreign-key field.
    pub fn related_set(&self, field: &str) -> Result<QuerySet<'s>> {
        let field = self.relation_field(field)?;
        let schema = self.session.schema();
        match &field.kind {
            FieldKind::ManyToMany(link) => {
                let target = schema.model(&link.target)?;
                let link = ManyLink::new(link, Side::Forward, self.id.clone())?;
                let aux = link.aux(self.session)?;
                Ok(QuerySet::new(self.session, target, Scope::Related { link, aux }))
            }
            FieldKind::Reverse(link) if link.kind == RelationKind::ManyToMany => {
                let source = schema.model(&link.source)?;
                let link = ManyLink::new(link, Side::Reverse, self.id.clone())?;
                let aux = link.aux(self.session)?;
                Ok(QuerySet::new(self.session, source, Scope::Related { link, aux }))
            }
            FieldKind::Reverse(link) if link.kind == RelationKind::ForeignKey => {
                let source = schema.model(&link.source)?;
                let pattern = Record::new().with(link.field.clone(), &self.id);
                Ok(QuerySet::new(self.session, source, Scope::All).filter(Lookup::Pattern(pattern)))
            }
            _ => Err(Error::wrong_field_kind(
                self.model.name(),
                &*field.name,
                "a to-many relation",
            )),
        }
    }
}

impl fmt::Debug for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("model", &self.model.name())
            .field("id", &self.id)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}

impl PartialEq for Entity<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.model.name() == other.model.name() && self.id == other.id
    }
}

impl From<&Entity<'_>> for Value {
    fn from(entity: &Entity<'_>) -> Self {
        Value::from(&entity.id)
    }
}

impl From<Entity<'_>> for Value {
    fn from(entity: Entity<'_>) -> Self {
        Value::from(&entity.id)
    }
}

impl From<&Entity<'_>> for Id {
    fn from(entity: &Entity<'_>) -> Self {
        entity.id.clone()
    }
}
