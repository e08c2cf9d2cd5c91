//! Query sets: lazy, restartable views over a model's entities.
//!
//! A [`QuerySet`] is a description, not a result. It names a model, a scope
//! (every entity, a list of ids, or the entities related to one entity
//! through a many-to-many relation) and a list of clauses. Every read
//! evaluates the description against the session's current folded state, so
//! the same view observes each fold.
//!
//! The materialization mode is part of the type: `QuerySet<'s, Hydrated>`
//! yields [`Entity`] handles and `QuerySet<'s, Plain>` yields raw
//! [`Record`]s. Views derived from a view keep its mode.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tabula_foundation::{Error, Id, Record, Result, Value};
use tabula_storage::{Action, Patch, SortSpec};

use crate::entity::Entity;
use crate::relations::{self, ManyLink};
use crate::schema::ModelSchema;
use crate::session::Session;

/// Predicate form of a lookup.
pub type Predicate = Arc<dyn Fn(&Record) -> bool>;

/// Selects records.
#[derive(Clone)]
pub enum Lookup {
    /// Every field of the pattern must be present with an equal value.
    Pattern(Record),
    /// Arbitrary test.
    Predicate(Predicate),
}

impl Lookup {
    /// Creates a predicate lookup.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Record) -> bool + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Returns true if the record is selected.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Pattern(pattern) => record.matches(pattern),
            Self::Predicate(f) => f(record),
        }
    }
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(pattern) => write!(f, "{pattern:?}"),
            Self::Predicate(_) => f.write_str("<predicate>"),
        }
    }
}

impl From<Record> for Lookup {
    fn from(pattern: Record) -> Self {
        Self::Pattern(pattern)
    }
}

/// How a query set turns records into items.
pub trait Materialize: Copy + fmt::Debug {
    /// Short name used in debug output.
    const NAME: &'static str;

    /// The item type.
    type Item<'s>;

    /// Builds an item from a folded record.
    fn materialize<'s>(
        session: &'s Session,
        model: &'s ModelSchema,
        id: Id,
        record: Record,
    ) -> Self::Item<'s>;
}

/// Yields raw records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Plain;

/// Yields entity handles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hydrated;

impl Materialize for Plain {
    const NAME: &'static str = "plain";

    type Item<'s> = Record;

    fn materialize<'s>(_: &'s Session, _: &'s ModelSchema, _: Id, record: Record) -> Record {
        record
    }
}

impl Materialize for Hydrated {
    const NAME: &'static str = "hydrated";

    type Item<'s> = Entity<'s>;

    fn materialize<'s>(
        session: &'s Session,
        model: &'s ModelSchema,
        id: Id,
        record: Record,
    ) -> Entity<'s> {
        Entity::new(session, model, id, record)
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Scope<'s> {
    All,
    Ids(Vec<Id>),
    Related {
        link: ManyLink,
        aux: &'s ModelSchema,
    },
}

#[derive(Clone, Debug)]
enum Clause {
    Filter(Lookup),
    Exclude(Lookup),
    OrderBy(SortSpec),
}

/// A lazy view over some of a model's entities.
pub struct QuerySet<'s, M = Hydrated> {
    session: &'s Session,
    model: &'s ModelSchema,
    scope: Scope<'s>,
    clauses: Vec<Clause>,
    mode: PhantomData<M>,
}

impl<M> Clone for QuerySet<'_, M> {
    fn clone(&self) -> Self {
        Self {
            session: self.session,
            model: self.model,
            scope: self.scope.clone(),
            clauses: self.clauses.clone(),
            mode: PhantomData,
        }
    }
}

impl<M: Materialize> fmt::Debug for QuerySet<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("model", &self.model.name())
            .field("scope", &self.scope)
            .field("clauses", &self.clauses)
            .field("mode", &M::NAME)
            .finish()
    }
}

impl<'s> QuerySet<'s, Hydrated> {
    pub(crate) fn new(session: &'s Session, model: &'s ModelSchema, scope: Scope<'s>) -> Self {
        Self {
            session,
            model,
            scope,
            clauses: Vec::new(),
            mode: PhantomData,
        }
    }
}

impl<'s, M: Materialize> QuerySet<'s, M> {
    fn derive<N>(&self, clause: Option<Clause>) -> QuerySet<'s, N> {
        let mut clauses = self.clauses.clone();
        clauses.extend(clause);
        QuerySet {
            session: self.session,
            model: self.model,
            scope: self.scope.clone(),
            clauses,
            mode: PhantomData,
        }
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &'s str {
        self.model.name()
    }

    /// Keeps records matching `lookup`.
    #[must_use]
    pub fn filter(&self, lookup: impl Into<Lookup>) -> Self {
        self.derive(Some(Clause::Filter(lookup.into())))
    }

    /// Drops records matching `lookup`.
    #[must_use]
    pub fn exclude(&self, lookup: impl Into<Lookup>) -> Self {
        self.derive(Some(Clause::Exclude(lookup.into())))
    }

    /// Sorts on evaluation. Does not touch the store's own order.
    #[must_use]
    pub fn order_by(&self, sort: impl Into<SortSpec>) -> Self {
        self.derive(Some(Clause::OrderBy(sort.into())))
    }

    /// Returns the same view yielding raw records.
    #[must_use]
    pub fn as_plain(&self) -> QuerySet<'s, Plain> {
        self.derive(None)
    }

    /// Returns the same view yielding entity handles.
    #[must_use]
    pub fn as_hydrated(&self) -> QuerySet<'s, Hydrated> {
        self.derive(None)
    }

    /// Evaluates the view against the current folded state.
    fn evaluate(&self) -> Vec<(Id, Record)> {
        let attr = self.model.id_attribute();
        let mut rows: Vec<(Id, Record)> = self
            .session
            .records(self.model)
            .into_iter()
            .filter_map(|record| record.get(attr).and_then(Value::as_id).map(|id| (id, record)))
            .collect();

        match &self.scope {
            Scope::All => {}
            Scope::Ids(ids) => {
                let wanted: HashSet<&Id> = ids.iter().collect();
                rows.retain(|(id, _)| wanted.contains(id));
            }
            Scope::Related { link, aux } => {
                let related: HashSet<Id> = link
                    .related_ids_in(self.session, aux, false)
                    .into_iter()
                    .collect();
                rows.retain(|(id, _)| related.contains(id));
            }
        }

        for clause in &self.clauses {
            match clause {
                Clause::Filter(lookup) => rows.retain(|(_, record)| lookup.matches(record)),
                Clause::Exclude(lookup) => rows.retain(|(_, record)| !lookup.matches(record)),
                Clause::OrderBy(sort) => rows.sort_by(|(_, a), (_, b)| sort.compare(a, b)),
            }
        }
        rows
    }

    fn item(&self, (id, record): (Id, Record)) -> M::Item<'s> {
        M::materialize(self.session, self.model, id, record)
    }

    /// Applies `f` to every item.
    pub fn map<T, F>(&self, f: F) -> Vec<T>
    where
        F: FnMut(M::Item<'s>) -> T,
    {
        self.to_vec().into_iter().map(f).collect()
    }

    /// Returns every item.
    #[must_use]
    pub fn to_vec(&self) -> Vec<M::Item<'s>> {
        self.evaluate().into_iter().map(|row| self.item(row)).collect()
    }

    /// Returns the identifiers in view order.
    #[must_use]
    pub fn ids(&self) -> Vec<Id> {
        self.evaluate().into_iter().map(|(id, _)| id).collect()
    }

    /// Returns the number of matching entities.
    #[must_use]
    pub fn count(&self) -> usize {
        self.evaluate().len()
    }

    /// Returns true if anything matches.
    #[must_use]
    pub fn exists(&self) -> bool {
        !self.evaluate().is_empty()
    }

    /// Returns the item at `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<M::Item<'s>> {
        self.evaluate().into_iter().nth(index).map(|row| self.item(row))
    }

    /// Returns the first item.
    #[must_use]
    pub fn first(&self) -> Option<M::Item<'s>> {
        self.at(0)
    }

    /// Returns the last item.
    #[must_use]
    pub fn last(&self) -> Option<M::Item<'s>> {
        self.evaluate().pop().map(|row| self.item(row))
    }

    /// Returns the single item matching `lookup`.
    ///
    /// # Errors
    ///
    /// Returns not-found if nothing matches and ambiguous if more than one
    /// entity matches.
    pub fn get(&self, lookup: impl Into<Lookup>) -> Result<M::Item<'s>> {
        let lookup = lookup.into();
        let mut rows = self.filter(lookup.clone()).evaluate();
        match rows.len() {
            0 => Err(Error::not_found(self.model.name(), format!("{lookup:?}"))),
            1 => Ok(self.item(rows.remove(0))),
            n => Err(Error::ambiguous(self.model.name(), n)),
        }
    }

    /// Enqueues one update covering every entity in view.
    ///
    /// # Errors
    ///
    /// Returns an error if a field patch names an undeclared field, the
    /// identifier, or a relation that is not stored.
    pub fn update(&self, patch: impl Into<Patch>) -> Result<()> {
        let patch = match patch.into() {
            Patch::Fields(fields) => Patch::Fields(relations::stored_patch(self.model, &fields)?),
            other @ Patch::With(_) => other,
        };
        let ids = self.ids();
        if !ids.is_empty() {
            self.session.enqueue(self.model, Action::update(ids, patch));
        }
        Ok(())
    }

    /// Enqueues deletion of every entity in view, after its cascade.
    ///
    /// # Errors
    ///
    /// Returns an error if an auxiliary model cannot be resolved.
    pub fn delete(&self) -> Result<()> {
        let ids = self.ids();
        if ids.is_empty() {
            return Ok(());
        }
        relations::cascade(self.session, self.model, &ids)?;
        self.session.enqueue(self.model, Action::delete(ids));
        Ok(())
    }

    fn many_link(&self) -> Result<&ManyLink> {
        match &self.scope {
            Scope::Related { link, .. } => Ok(link),
            Scope::All | Scope::Ids(_) => Err(Error::invalid_mutation(format!(
                "{} view is not a many-to-many relation",
                self.model.name()
            ))),
        }
    }

    fn relation_ids<V: Into<Value>>(&self, items: impl IntoIterator<Item = V>) -> Result<Vec<Id>> {
        items
            .into_iter()
            .map(|item| relations::to_id(self.model, self.model.id_attribute(), &item.into()))
            .collect()
    }

    /// Pairs the anchor entity with each item. Existing pairs are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if this is not a many-to-many view or an item is not
    /// an identifier or entity.
    pub fn add<V: Into<Value>>(&self, items: impl IntoIterator<Item = V>) -> Result<()> {
        let link = self.many_link()?;
        let ids = self.relation_ids(items)?;
        link.edit(self.session, &ids, &[])
    }

    /// Unpairs the anchor entity from each item. Missing pairs are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if this is not a many-to-many view or an item is not
    /// an identifier or entity.
    pub fn remove<V: Into<Value>>(&self, items: impl IntoIterator<Item = V>) -> Result<()> {
        let link = self.many_link()?;
        let ids = self.relation_ids(items)?;
        link.edit(self.session, &[], &ids)
    }

    /// Unpairs the anchor entity from everything.
    ///
    /// # Errors
    ///
    /// Returns an error if this is not a many-to-many view.
    pub fn clear(&self) -> Result<()> {
        self.many_link()?.clear(self.session)
    }
}
