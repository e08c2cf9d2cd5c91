//! Sessions and database state.
//!
//! A [`Session`] is the explicit context for one batch of work. It holds the
//! schema, the last folded [`Database`], and one store context per model
//! (backend, pending actions, identifier allocator). Mutations enqueue
//! actions; nothing becomes readable until [`Session::next_state`] folds them.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::Arc;

use tabula_foundation::{ErrorContext, Id, LtMap, Record, Result, Value};
use tabula_storage::{Action, Backend, Branch, IdAllocator, UpdateQueue, backend_for, fold};
use tracing::{debug, trace};

use crate::field::ModelName;
use crate::model::ModelRef;
use crate::schema::{ModelSchema, Schema};

/// Every model's branch, keyed by model name.
///
/// A model with no branch is in the undefined state; folding it yields the
/// empty default state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Database {
    branches: LtMap<ModelName, Branch>,
}

impl Database {
    /// Creates a database with no branches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a model's branch.
    #[must_use]
    pub fn get(&self, model: &str) -> Option<&Branch> {
        self.branches.get(model)
    }

    /// Returns a new database with a model's branch replaced.
    #[must_use]
    pub fn with_branch(&self, model: impl Into<ModelName>, branch: Branch) -> Self {
        Self {
            branches: self.branches.insert(model.into(), branch),
        }
    }

    /// Returns a new database without a model's branch.
    #[must_use]
    pub fn without(&self, model: &str) -> Self {
        Self {
            branches: self.branches.remove(model),
        }
    }

    /// Returns the number of branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Returns true if there are no branches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Returns `(model, branch)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&ModelName, &Branch)> {
        self.branches.iter()
    }

    fn set_mut(&mut self, model: ModelName, branch: Branch) {
        self.branches.insert_mut(model, branch);
    }
}

impl FromIterator<(ModelName, Branch)> for Database {
    fn from_iter<I: IntoIterator<Item = (ModelName, Branch)>>(iter: I) -> Self {
        Self {
            branches: iter.into_iter().collect(),
        }
    }
}

/// Per-model bookkeeping inside a session.
struct StoreContext {
    backend: Box<dyn Backend>,
    queue: RefCell<UpdateQueue>,
    /// Seeded lazily from the folded branch; reset by every fold.
    ids: Cell<Option<IdAllocator>>,
}

impl fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreContext")
            .field("backend", &self.backend)
            .field("pending", &self.queue.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Context for one batch of reads and writes.
///
/// Sessions are single-threaded; handles and query sets borrow the session
/// and stay usable across folds.
#[derive(Debug)]
pub struct Session {
    schema: Arc<Schema>,
    state: RefCell<Database>,
    stores: Vec<StoreContext>,
}

impl Session {
    /// Creates a session over empty branches.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        let state = schema.default_state();
        Self::with_state(schema, state)
    }

    /// Creates a session over an existing database.
    #[must_use]
    pub fn with_state(schema: Arc<Schema>, state: Database) -> Self {
        let stores = schema
            .models()
            .map(|model| StoreContext {
                backend: backend_for(model.config().clone()),
                queue: RefCell::new(UpdateQueue::new()),
                ids: Cell::new(None),
            })
            .collect();
        Self {
            schema,
            state: RefCell::new(state),
            stores,
        }
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the last folded database.
    #[must_use]
    pub fn state(&self) -> Database {
        self.state.borrow().clone()
    }

    /// Returns a handle on one model.
    ///
    /// # Errors
    ///
    /// Returns an unknown-model error.
    pub fn model(&self, name: &str) -> Result<ModelRef<'_>> {
        let model = self.schema.model(name)?;
        Ok(ModelRef::new(self, model))
    }

    /// Returns the number of actions waiting to be folded, across all stores.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.stores.iter().map(|store| store.queue.borrow().len()).sum()
    }

    /// Folds every store's queue, installs the result, and returns it.
    ///
    /// Stores are folded in registration order.
    pub fn next_state(&self) -> Database {
        let mut next = self.state();
        let mut folded = 0usize;
        for model in self.schema.models() {
            let actions = self.store(model).queue.borrow_mut().take();
            folded += actions.len();
            let branch = self.fold_store(model, next.get(model.name()).cloned(), &actions);
            next.set_mut(Arc::clone(model.model_name()), branch);
        }
        debug!(target: "tabula::model", actions = folded, "database folded");
        self.state.replace(next.clone());
        next
    }

    /// Folds one store's queue, installs the result, and returns it.
    pub(crate) fn next_branch(&self, model: &ModelSchema) -> Branch {
        let actions = self.store(model).queue.borrow_mut().take();
        let current = self.branch(model);
        let branch = self.fold_store(model, current, &actions);
        let mut state = self.state.borrow_mut();
        let next = state.with_branch(Arc::clone(model.model_name()), branch.clone());
        *state = next;
        branch
    }

    fn fold_store(
        &self,
        model: &ModelSchema,
        current: Option<Branch>,
        actions: &[Action],
    ) -> Branch {
        let store = self.store(model);
        store.ids.set(None);
        if !actions.is_empty() {
            debug!(
                target: "tabula::model",
                model = model.name(),
                actions = actions.len(),
                "folding store"
            );
        }
        fold(store.backend.as_ref(), current, actions)
    }

    fn store(&self, model: &ModelSchema) -> &StoreContext {
        &self.stores[model.slot()]
    }

    pub(crate) fn backend(&self, model: &ModelSchema) -> &dyn Backend {
        self.store(model).backend.as_ref()
    }

    /// Returns the folded branch, or `None` in the undefined state.
    pub(crate) fn branch(&self, model: &ModelSchema) -> Option<Branch> {
        self.state.borrow().get(model.name()).cloned()
    }

    /// Returns the folded records in order.
    pub(crate) fn records(&self, model: &ModelSchema) -> Vec<Record> {
        self.branch(model)
            .map(|branch| self.backend(model).materialize_all(&branch))
            .unwrap_or_default()
    }

    /// Returns one folded record.
    pub(crate) fn lookup(&self, model: &ModelSchema, id: &Id) -> Option<Record> {
        let branch = self.branch(model)?;
        let backend = self.backend(model);
        backend.lookup(&branch, id).map(|record| {
            if record.contains(model.id_attribute()) {
                record.clone()
            } else {
                record.set(model.id_attribute(), id)
            }
        })
    }

    /// Returns the records the store would hold if its queue were folded now.
    ///
    /// Used for relation bookkeeping, which must account for work already
    /// queued in the same batch. Ordinary reads never see pending actions.
    pub(crate) fn projected_records(&self, model: &ModelSchema) -> Vec<Record> {
        let backend = self.backend(model);
        let queue = self.store(model).queue.borrow();
        if queue.is_empty() {
            drop(queue);
            return self.records(model);
        }
        let start = self.branch(model).unwrap_or_else(|| backend.default_state());
        let projected = fold(backend, Some(start), queue.as_slice());
        backend.materialize_all(&projected)
    }

    /// Appends an action to a store's queue.
    pub(crate) fn enqueue(&self, model: &ModelSchema, action: Action) {
        trace!(target: "tabula::model", model = model.name(), kind = %action.kind(), "enqueue");
        let store = self.store(model);
        if let (Action::Create(record), Some(mut ids)) = (&action, store.ids.get()) {
            if let Some(id) = record.get(model.id_attribute()).and_then(Value::as_id) {
                ids.observe(&id);
                store.ids.set(Some(ids));
            }
        }
        store.queue.borrow_mut().push(action);
    }

    /// Allocates an integer identifier unused by the store and its queue.
    pub(crate) fn allocate_id(&self, model: &ModelSchema) -> Result<Id> {
        let store = self.store(model);
        let mut ids = store.ids.get().unwrap_or_else(|| self.seed_ids(model));
        let id = ids
            .allocate()
            .map_err(|err| err.with_context(ErrorContext::new().with_model(model.name())))?;
        store.ids.set(Some(ids));
        Ok(id)
    }

    fn seed_ids(&self, model: &ModelSchema) -> IdAllocator {
        let attr = model.id_attribute();
        let mut ids = match self.branch(model) {
            Some(branch) => IdAllocator::seeded(&self.backend(model).ids(&branch)),
            None => IdAllocator::new(),
        };
        for action in self.store(model).queue.borrow().iter() {
            if let Action::Create(record) = action {
                if let Some(id) = record.get(attr).and_then(Value::as_id) {
                    ids.observe(&id);
                }
            }
        }
        ids
    }

    /// Returns a copy of a store's pending actions.
    pub(crate) fn pending_actions(&self, model: &ModelSchema) -> Vec<Action> {
        self.store(model).queue.borrow().as_slice().to_vec()
    }
}
