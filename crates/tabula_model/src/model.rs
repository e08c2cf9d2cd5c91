//! Model handles.

use std::fmt;

use tabula_foundation::{Error, Id, Record, Result, Value};
use tabula_storage::{Action, Branch, Patch, SortSpec};
use tracing::trace;

use crate::entity::Entity;
use crate::field::FieldKind;
use crate::query::{Hydrated, Lookup, QuerySet, Scope};
use crate::relations::{self, ManyLink, Side};
use crate::schema::ModelSchema;
use crate::session::Session;

/// One model within a session.
#[derive(Clone, Copy)]
pub struct ModelRef<'s> {
    session: &'s Session,
    model: &'s ModelSchema,
}

impl<'s> ModelRef<'s> {
    pub(crate) fn new(session: &'s Session, model: &'s ModelSchema) -> Self {
        Self { session, model }
    }

    /// Returns the model name.
    #[must_use]
    pub fn name(&self) -> &'s str {
        self.model.name()
    }

    /// Returns the model schema.
    #[must_use]
    pub fn schema(&self) -> &'s ModelSchema {
        self.model
    }

    /// Enqueues creation of an entity and returns its identifier.
    ///
    /// A missing identifier is allocated. Lists given for many-to-many
    /// fields become pairs in the auxiliary store. Every field is checked
    /// before anything is enqueued.
    ///
    /// # Errors
    ///
    /// Returns an unknown-field error, an invalid-mutation error for a nil,
    /// empty, or malformed identifier, a reverse field, or a value of the
    /// wrong shape, or an exhausted error when no integer identifier is left.
    pub fn create(&self, fields: impl Into<Record>) -> Result<Id> {
        let fields = fields.into();
        let attr = self.model.id_attribute();

        let explicit = match fields.get(attr) {
            None => None,
            Some(Value::Nil) => {
                return Err(Error::invalid_mutation(format!(
                    "{}.{attr} cannot be nil",
                    self.model.name()
                )));
            }
            Some(Value::String(s)) if s.is_empty() => {
                return Err(Error::invalid_mutation(format!(
                    "{}.{attr} cannot be empty",
                    self.model.name()
                )));
            }
            Some(value) => Some(value.as_id().ok_or_else(|| {
                Error::invalid_mutation(format!(
                    "{}.{attr} must be an integer or string, got {value}",
                    self.model.name()
                ))
            })?),
        };

        let mut stored = Record::new();
        let mut many = Vec::new();
        for (name, value) in fields.iter() {
            let field = self.model.require_field(name)?;
            match &field.kind {
                FieldKind::Identifier => {}
                FieldKind::ManyToMany(link) => {
                    many.push((link, relations::to_ids(self.model, name, value)?));
                }
                _ => {
                    let value = relations::stored_value(self.model, field, value.clone())?;
                    stored.set_mut(name.clone(), value);
                }
            }
        }

        let id = match explicit {
            Some(id) => id,
            None => self.session.allocate_id(self.model)?,
        };
        stored.set_mut(attr, &id);
        trace!(target: "tabula::model", model = self.model.name(), id = %id, "create");
        self.session.enqueue(self.model, Action::Create(stored));

        for (link, ids) in many {
            ManyLink::new(link, Side::Forward, id.clone())?.replace(self.session, &ids)?;
        }
        Ok(id)
    }

    /// Updates the entity named by the record's identifier if it exists in
    /// the folded state, otherwise creates it.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create) and [`Entity::update`].
    pub fn upsert(&self, fields: impl Into<Record>) -> Result<Id> {
        let fields = fields.into();
        let attr = self.model.id_attribute();
        let existing = fields
            .get(attr)
            .and_then(Value::as_id)
            .and_then(|id| self.with_id(id).ok());
        match existing {
            Some(entity) => {
                entity.update(&fields.without(attr))?;
                Ok(entity.id().clone())
            }
            None => self.create(fields),
        }
    }

    /// Returns the entity with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns not-found if the folded state has no such entity.
    pub fn with_id(&self, id: impl Into<Id>) -> Result<Entity<'s>> {
        let id = id.into();
        self.session
            .lookup(self.model, &id)
            .map(|record| Entity::new(self.session, self.model, id.clone(), record))
            .ok_or_else(|| {
                Error::not_found(
                    self.model.name(),
                    format!("{} = {id}", self.model.id_attribute()),
                )
            })
    }

    /// Returns true if the folded state holds the identifier.
    #[must_use]
    pub fn exists(&self, id: impl Into<Id>) -> bool {
        self.session.lookup(self.model, &id.into()).is_some()
    }

    /// Returns the single entity matching `lookup`.
    ///
    /// # Errors
    ///
    /// Returns not-found or ambiguous.
    pub fn get(&self, lookup: impl Into<Lookup>) -> Result<Entity<'s>> {
        self.all().get(lookup)
    }

    /// Returns a view over every entity.
    #[must_use]
    pub fn all(&self) -> QuerySet<'s, Hydrated> {
        QuerySet::new(self.session, self.model, Scope::All)
    }

    /// Returns a view over the listed entities, in store order.
    #[must_use]
    pub fn only(&self, ids: impl IntoIterator<Item = impl Into<Id>>) -> QuerySet<'s, Hydrated> {
        let ids = ids.into_iter().map(Into::into).collect();
        QuerySet::new(self.session, self.model, Scope::Ids(ids))
    }

    /// Returns a view over entities matching `lookup`.
    #[must_use]
    pub fn filter(&self, lookup: impl Into<Lookup>) -> QuerySet<'s, Hydrated> {
        self.all().filter(lookup)
    }

    /// Returns a view over entities not matching `lookup`.
    #[must_use]
    pub fn exclude(&self, lookup: impl Into<Lookup>) -> QuerySet<'s, Hydrated> {
        self.all().exclude(lookup)
    }

    /// Returns the number of entities.
    #[must_use]
    pub fn count(&self) -> usize {
        self.all().count()
    }

    /// Enqueues a reorder of the store.
    pub fn order_by(&self, sort: impl Into<SortSpec>) {
        self.session.enqueue(self.model, Action::Order(sort.into()));
    }

    /// Enqueues one update covering every listed identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if a field patch touches a field that cannot be
    /// written directly.
    pub fn update(
        &self,
        ids: impl IntoIterator<Item = impl Into<Id>>,
        patch: impl Into<Patch>,
    ) -> Result<()> {
        self.only(ids).update(patch)
    }

    /// Returns the folded branch, or `None` in the undefined state.
    #[must_use]
    pub fn state(&self) -> Option<Branch> {
        self.session.branch(self.model)
    }

    /// Returns an empty branch in this store's representation.
    #[must_use]
    pub fn default_state(&self) -> Branch {
        self.session.backend(self.model).default_state()
    }

    /// Folds this store's queue, installs the result, and returns it.
    pub fn next_state(&self) -> Branch {
        self.session.next_branch(self.model)
    }

    /// Returns this store's pending actions.
    #[must_use]
    pub fn pending(&self) -> Vec<Action> {
        self.session.pending_actions(self.model)
    }
}

impl fmt::Debug for ModelRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelRef").field(&self.model.name()).finish()
    }
}
