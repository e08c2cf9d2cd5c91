//! Relation bookkeeping: many-to-many edits, value normalization, and
//! delete cascades.
//!
//! Everything here writes by enqueuing actions on the owning store. Edits
//! are computed against the *projected* auxiliary rows (folded rows with the
//! store's pending actions applied), so several edits in one batch compose.

use std::collections::HashSet;
use std::sync::Arc;

use tabula_foundation::{Error, ErrorContext, FieldName, Id, Record, Result, Value};
use tabula_storage::{Action, Patch};
use tracing::debug;

use crate::field::{Field, FieldKind, Link, ModelName, RelationKind, Through};
use crate::schema::ModelSchema;
use crate::session::Session;

/// Which end of a many-to-many relation the anchor entity sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// The anchor declared the relation.
    Forward,
    /// The anchor is the relation's target.
    Reverse,
}

/// A many-to-many relation seen from one entity.
#[derive(Clone, Debug)]
pub struct ManyLink {
    link: Arc<Link>,
    through: Through,
    side: Side,
    anchor: Id,
}

impl ManyLink {
    /// Views `link` from `anchor` on the given side.
    ///
    /// # Errors
    ///
    /// Returns a wrong-field-kind error if `link` is not many-to-many.
    pub fn new(link: &Arc<Link>, side: Side, anchor: Id) -> Result<Self> {
        let through = link.through.clone().ok_or_else(|| {
            Error::wrong_field_kind(&*link.source, &*link.field, "a many-to-many relation")
        })?;
        Ok(Self {
            link: Arc::clone(link),
            through,
            side,
            anchor,
        })
    }

    /// Returns the anchor identifier.
    #[must_use]
    pub fn anchor(&self) -> &Id {
        &self.anchor
    }

    /// Returns the side the anchor sits on.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Returns the model on the other end.
    #[must_use]
    pub fn other_model(&self) -> &ModelName {
        match self.side {
            Side::Forward => &self.link.target,
            Side::Reverse => &self.link.source,
        }
    }

    fn anchor_column(&self) -> &FieldName {
        match self.side {
            Side::Forward => &self.through.source_column,
            Side::Reverse => &self.through.target_column,
        }
    }

    fn other_column(&self) -> &FieldName {
        match self.side {
            Side::Forward => &self.through.target_column,
            Side::Reverse => &self.through.source_column,
        }
    }

    /// Resolves the auxiliary model holding the pairs.
    pub(crate) fn aux<'s>(&self, session: &'s Session) -> Result<&'s ModelSchema> {
        session.schema().model(&self.through.model)
    }

    /// Returns `(row id, other id)` for every auxiliary row touching the anchor.
    fn rows(&self, session: &Session, aux: &ModelSchema, projected: bool) -> Vec<(Id, Id)> {
        let records = if projected {
            session.projected_records(aux)
        } else {
            session.records(aux)
        };
        let anchor = Value::from(&self.anchor);
        records
            .iter()
            .filter(|row| row.get(self.anchor_column()) == Some(&anchor))
            .filter_map(|row| {
                let row_id = row.get(aux.id_attribute()).and_then(Value::as_id)?;
                let other = row.get(self.other_column()).and_then(Value::as_id)?;
                Some((row_id, other))
            })
            .collect()
    }

    /// Returns the related identifiers in auxiliary row order, without duplicates.
    pub(crate) fn related_ids(&self, session: &Session, projected: bool) -> Result<Vec<Id>> {
        let aux = self.aux(session)?;
        Ok(self.related_ids_in(session, aux, projected))
    }

    /// Like [`related_ids`](Self::related_ids), with the auxiliary model
    /// already resolved.
    pub(crate) fn related_ids_in(
        &self,
        session: &Session,
        aux: &ModelSchema,
        projected: bool,
    ) -> Vec<Id> {
        let mut seen = HashSet::new();
        self.rows(session, aux, projected)
            .into_iter()
            .filter_map(|(_, other)| seen.insert(other.clone()).then_some(other))
            .collect()
    }

    /// Enqueues auxiliary deletes for `remove`, then creates for `add`.
    ///
    /// Pairs already present are not added again and pairs that are absent
    /// are not removed.
    pub(crate) fn edit(&self, session: &Session, add: &[Id], remove: &[Id]) -> Result<()> {
        let aux = self.aux(session)?;
        let rows = self.rows(session, aux, true);
        let doomed: HashSet<&Id> = remove.iter().collect();

        let row_ids: Vec<Id> = rows
            .iter()
            .filter(|(_, other)| doomed.contains(other))
            .map(|(row, _)| row.clone())
            .collect();
        let removed = row_ids.len();
        if !row_ids.is_empty() {
            session.enqueue(aux, Action::delete(row_ids));
        }

        let mut present: HashSet<Id> = rows
            .into_iter()
            .filter(|(_, other)| !doomed.contains(other))
            .map(|(_, other)| other)
            .collect();
        let mut added = 0usize;
        for other in add {
            if !present.insert(other.clone()) {
                continue;
            }
            let row_id = session.allocate_id(aux)?;
            let row = Record::new()
                .with(aux.id_attribute(), &row_id)
                .with(Arc::clone(self.anchor_column()), &self.anchor)
                .with(Arc::clone(self.other_column()), other);
            session.enqueue(aux, Action::Create(row));
            added += 1;
        }

        debug!(
            target: "tabula::model",
            through = aux.name(),
            anchor = %self.anchor,
            added,
            removed,
            "many-to-many edit"
        );
        Ok(())
    }

    /// Makes the related set exactly `wanted`.
    pub(crate) fn replace(&self, session: &Session, wanted: &[Id]) -> Result<()> {
        let current = self.related_ids(session, true)?;
        let current_set: HashSet<&Id> = current.iter().collect();
        let wanted_set: HashSet<&Id> = wanted.iter().collect();
        let to_remove: Vec<Id> = current
            .iter()
            .filter(|id| !wanted_set.contains(id))
            .cloned()
            .collect();
        let to_add: Vec<Id> = wanted
            .iter()
            .filter(|id| !current_set.contains(id))
            .cloned()
            .collect();
        self.edit(session, &to_add, &to_remove)
    }

    /// Removes every pair touching the anchor.
    pub(crate) fn clear(&self, session: &Session) -> Result<()> {
        let current = self.related_ids(session, true)?;
        self.edit(session, &[], &current)
    }
}

fn context(model: &ModelSchema, field: &str) -> ErrorContext {
    ErrorContext::new().with_model(model.name()).with_field(field)
}

/// Converts a value to an identifier for a relation argument.
pub(crate) fn to_id(model: &ModelSchema, field: &str, value: &Value) -> Result<Id> {
    value.as_id().ok_or_else(|| {
        Error::invalid_mutation(format!("expected an identifier or entity, got {value}"))
            .with_context(context(model, field))
    })
}

/// Converts a list value to identifiers for a many-to-many assignment.
pub(crate) fn to_ids(model: &ModelSchema, field: &str, value: &Value) -> Result<Vec<Id>> {
    let Some(items) = value.as_list() else {
        return Err(Error::invalid_mutation(format!(
            "many-to-many assignment needs a list, got {value}"
        ))
        .with_context(context(model, field)));
    };
    items.iter().map(|item| to_id(model, field, item)).collect()
}

/// Checks and normalizes a value written to a stored field.
pub(crate) fn stored_value(model: &ModelSchema, field: &Field, value: Value) -> Result<Value> {
    match &field.kind {
        FieldKind::Attribute => Ok(value),
        FieldKind::ForeignKey(_) | FieldKind::OneToOne(_) => {
            if value.is_nil() {
                Ok(value)
            } else {
                to_id(model, &field.name, &value).map(Value::from)
            }
        }
        FieldKind::Identifier => Err(Error::invalid_mutation("identifier is immutable")
            .with_context(context(model, &field.name))),
        FieldKind::ManyToMany(_) => Err(Error::invalid_mutation(
            "many-to-many fields are edited through their related set",
        )
        .with_context(context(model, &field.name))),
        FieldKind::Reverse(_) => Err(Error::invalid_mutation("reverse relations are read-only")
            .with_context(context(model, &field.name))),
    }
}

/// Validates a field patch for stored fields only.
pub(crate) fn stored_patch(model: &ModelSchema, fields: &Record) -> Result<Record> {
    let mut patch = Record::new();
    for (name, value) in fields.iter() {
        let field = model.require_field(name)?;
        patch.set_mut(Arc::clone(name), stored_value(model, field, value.clone())?);
    }
    Ok(patch)
}

/// Enqueues the side effects of deleting `ids` from `model`.
///
/// Auxiliary rows mentioning a deleted entity on either side are removed,
/// and every stored reference to one is set to nil. The caller enqueues the
/// delete itself afterwards.
pub(crate) fn cascade(session: &Session, model: &ModelSchema, ids: &[Id]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let schema = session.schema();
    let doomed: HashSet<&Id> = ids.iter().collect();
    let mentions = |record: &Record, column: &str| {
        record
            .get(column)
            .and_then(Value::as_id)
            .is_some_and(|id| doomed.contains(&id))
    };

    for (field, link) in model.links() {
        match (&field.kind, link.kind) {
            (FieldKind::ManyToMany(_), _) | (FieldKind::Reverse(_), RelationKind::ManyToMany) => {
                let Some(through) = &link.through else {
                    continue;
                };
                let column = if matches!(field.kind, FieldKind::ManyToMany(_)) {
                    &through.source_column
                } else {
                    &through.target_column
                };
                let aux = schema.model(&through.model)?;
                let rows: Vec<Id> = session
                    .projected_records(aux)
                    .iter()
                    .filter(|row| mentions(row, &**column))
                    .filter_map(|row| row.get(aux.id_attribute()).and_then(Value::as_id))
                    .collect();
                if !rows.is_empty() {
                    debug!(
                        target: "tabula::model",
                        through = aux.name(),
                        rows = rows.len(),
                        "cascade removes pairs"
                    );
                    session.enqueue(aux, Action::delete(rows));
                }
            }
            (FieldKind::Reverse(_), RelationKind::ForeignKey | RelationKind::OneToOne) => {
                let source = schema.model(&link.source)?;
                let referencing: Vec<Id> = session
                    .projected_records(source)
                    .iter()
                    .filter(|record| mentions(record, &*link.field))
                    .filter_map(|record| record.get(source.id_attribute()).and_then(Value::as_id))
                    .collect();
                if !referencing.is_empty() {
                    debug!(
                        target: "tabula::model",
                        model = source.name(),
                        field = &*link.field,
                        entities = referencing.len(),
                        "cascade clears references"
                    );
                    let patch = Record::new().with(Arc::clone(&link.field), Value::Nil);
                    session.enqueue(source, Action::update(referencing, Patch::from(patch)));
                }
            }
            _ => {}
        }
    }
    Ok(())
}
