//! Schema registration.
//!
//! Models are declared with [`ModelDef`] and registered through
//! [`SchemaBuilder`]. Building the schema resolves every declaration once:
//! reverse accessor names are derived, each many-to-many relation gets its
//! auxiliary model, and every model ends up with a static field table.
//! Nothing is resolved lazily afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use tabula_foundation::{Error, ErrorContext, FieldName, Result};
use tabula_storage::BranchConfig;
use tracing::debug;

use crate::field::{
    Field, FieldKind, Link, ModelName, Relation, RelationKind, Through, pascal_case, snake_case,
};
use crate::session::Database;

/// Declaration of one model.
#[derive(Clone, Debug)]
pub struct ModelDef {
    name: ModelName,
    attributes: Vec<FieldName>,
    relations: Vec<(FieldName, Relation)>,
    config: Option<BranchConfig>,
}

impl ModelDef {
    /// Starts a declaration.
    #[must_use]
    pub fn new(name: impl Into<ModelName>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            relations: Vec::new(),
            config: None,
        }
    }

    /// Declares a plain attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<FieldName>) -> Self {
        self.attributes.push(name.into());
        self
    }

    /// Declares a relation stored under `field`.
    #[must_use]
    pub fn with_relation(mut self, field: impl Into<FieldName>, relation: Relation) -> Self {
        self.relations.push((field.into(), relation));
        self
    }

    /// Gives this model its own store configuration.
    #[must_use]
    pub fn with_config(mut self, config: BranchConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Returns the model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Collects model declarations and resolves them into a [`Schema`].
#[derive(Clone, Debug, Default)]
pub struct SchemaBuilder {
    default_config: BranchConfig,
    models: Vec<ModelDef>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration used by models that do not carry their own,
    /// including auxiliary models.
    #[must_use]
    pub fn with_default_config(mut self, config: BranchConfig) -> Self {
        self.default_config = config;
        self
    }

    /// Registers a model.
    #[must_use]
    pub fn with_model(mut self, model: ModelDef) -> Self {
        self.models.push(model);
        self
    }

    /// Resolves every declaration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a duplicate model name, a relation
    /// to an undeclared model, a field name used twice on one model
    /// (including derived reverse names), or an invalid store configuration.
    pub fn build(self) -> Result<Arc<Schema>> {
        let Self {
            default_config,
            models: defs,
        } = self;

        let mut models: Vec<ModelSchema> = Vec::with_capacity(defs.len());
        let mut index: HashMap<ModelName, usize> = HashMap::new();

        for def in &defs {
            if index.contains_key(&def.name) {
                return Err(Error::configuration(format!("duplicate model {}", def.name)));
            }
            let config = def.config.clone().unwrap_or_else(|| default_config.clone());
            config.validate().map_err(|e| in_model(e, &def.name))?;
            index.insert(Arc::clone(&def.name), models.len());
            models.push(ModelSchema::new(Arc::clone(&def.name), models.len(), config));
        }

        // Forward fields first, so reverse names are checked against all of them.
        let mut links: Vec<Arc<Link>> = Vec::new();
        for def in &defs {
            let slot = index[&def.name];
            for attribute in &def.attributes {
                models[slot].add_field(Field::new(Arc::clone(attribute), FieldKind::Attribute))?;
            }
            for (field, relation) in &def.relations {
                let target = relation.target();
                if !index.contains_key(target) {
                    return Err(
                        Error::configuration(format!("relation targets undeclared model {target}"))
                            .with_context(
                                ErrorContext::new().with_model(&*def.name).with_field(&**field),
                            ),
                    );
                }
                let link = Arc::new(resolve_link(&def.name, field, relation));
                let kind = match link.kind {
                    RelationKind::ForeignKey => FieldKind::ForeignKey(Arc::clone(&link)),
                    RelationKind::OneToOne => FieldKind::OneToOne(Arc::clone(&link)),
                    RelationKind::ManyToMany => FieldKind::ManyToMany(Arc::clone(&link)),
                };
                models[slot].add_field(Field::new(Arc::clone(field), kind))?;
                links.push(link);
            }
        }

        for link in &links {
            let slot = index[&link.target];
            models[slot].add_field(Field::new(
                Arc::clone(&link.related_name),
                FieldKind::Reverse(Arc::clone(link)),
            ))?;
        }

        for link in &links {
            let Some(through) = &link.through else {
                continue;
            };
            if index.contains_key(&through.model) {
                return Err(Error::configuration(format!(
                    "auxiliary model {} for {}.{} collides with a declared model",
                    through.model, link.source, link.field
                )));
            }
            let mut aux = ModelSchema::new(
                Arc::clone(&through.model),
                models.len(),
                default_config.clone(),
            );
            aux.through = Some(Arc::clone(link));
            aux.add_field(Field::new(Arc::clone(&through.source_column), FieldKind::Attribute))?;
            aux.add_field(Field::new(Arc::clone(&through.target_column), FieldKind::Attribute))?;
            index.insert(Arc::clone(&through.model), models.len());
            models.push(aux);
        }

        debug!(
            target: "tabula::model",
            models = models.len(),
            relations = links.len(),
            "schema built"
        );
        Ok(Arc::new(Schema { models, index }))
    }
}

fn resolve_link(source: &ModelName, field: &FieldName, relation: &Relation) -> Link {
    let target = Arc::clone(relation.target());
    let kind = relation.kind();
    let source_snake = snake_case(source);
    let related_name = relation.related_name().cloned().unwrap_or_else(|| match kind {
        RelationKind::OneToOne => source_snake.as_str().into(),
        RelationKind::ForeignKey | RelationKind::ManyToMany => format!("{source_snake}_set").into(),
    });
    let through = (kind == RelationKind::ManyToMany).then(|| Through {
        model: relation
            .through_name()
            .cloned()
            .unwrap_or_else(|| format!("{source}{}", pascal_case(field)).into()),
        source_column: format!("from_{source_snake}_id").into(),
        target_column: format!("to_{}_id", snake_case(&target)).into(),
    });
    Link {
        kind,
        source: Arc::clone(source),
        field: Arc::clone(field),
        target,
        related_name,
        through,
    }
}

fn in_model(error: Error, model: &str) -> Error {
    let context = error.context.clone().unwrap_or_default().with_model(model);
    error.with_context(context)
}

/// Resolved description of one model.
#[derive(Clone, Debug)]
pub struct ModelSchema {
    name: ModelName,
    slot: usize,
    config: BranchConfig,
    fields: Vec<Field>,
    by_name: HashMap<FieldName, usize>,
    through: Option<Arc<Link>>,
}

impl ModelSchema {
    fn new(name: ModelName, slot: usize, config: BranchConfig) -> Self {
        let mut model = Self {
            name,
            slot,
            fields: Vec::new(),
            by_name: HashMap::new(),
            through: None,
            config,
        };
        let id = Field::new(Arc::clone(&model.config.id_attribute), FieldKind::Identifier);
        model.by_name.insert(Arc::clone(&id.name), 0);
        model.fields.push(id);
        model
    }

    fn add_field(&mut self, field: Field) -> Result<()> {
        if self.by_name.contains_key(&field.name) {
            let context = ErrorContext::new()
                .with_model(&*self.name)
                .with_field(&*field.name);
            return Err(
                Error::configuration(format!("field {} is declared twice", field.name))
                    .with_context(context),
            );
        }
        self.by_name.insert(Arc::clone(&field.name), self.fields.len());
        self.fields.push(field);
        Ok(())
    }

    /// Returns the model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &BranchConfig {
        &self.config
    }

    /// Returns the identifier field name.
    #[must_use]
    pub fn id_attribute(&self) -> &str {
        &self.config.id_attribute
    }

    /// Looks up a field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Looks up a field, failing if it is not declared.
    ///
    /// # Errors
    ///
    /// Returns an unknown-field error.
    pub fn require_field(&self, name: &str) -> Result<&Field> {
        self.field(name)
            .ok_or_else(|| Error::unknown_field(&*self.name, name))
    }

    /// Returns every field in declaration order, identifier first.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Returns every relation touching this model, forward or reverse.
    pub fn links(&self) -> impl Iterator<Item = (&Field, &Arc<Link>)> {
        self.fields
            .iter()
            .filter_map(|field| field.kind.link().map(|link| (field, link)))
    }

    /// Returns the relation this model backs, if it is an auxiliary model.
    #[must_use]
    pub fn through_for(&self) -> Option<&Arc<Link>> {
        self.through.as_ref()
    }

    pub(crate) const fn slot(&self) -> usize {
        self.slot
    }

    pub(crate) fn model_name(&self) -> &ModelName {
        &self.name
    }
}

/// Every model, resolved.
#[derive(Debug)]
pub struct Schema {
    models: Vec<ModelSchema>,
    index: HashMap<ModelName, usize>,
}

impl Schema {
    /// Starts a schema declaration.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Looks up a model.
    ///
    /// # Errors
    ///
    /// Returns an unknown-model error.
    pub fn model(&self, name: &str) -> Result<&ModelSchema> {
        self.index
            .get(name)
            .map(|&i| &self.models[i])
            .ok_or_else(|| Error::unknown_model(name))
    }

    /// Returns every model in registration order; auxiliary models come last.
    pub fn models(&self) -> impl Iterator<Item = &ModelSchema> {
        self.models.iter()
    }

    /// Returns the number of models, auxiliary models included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns true if no models are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Returns a database with every branch empty.
    #[must_use]
    pub fn default_state(&self) -> Database {
        self.models
            .iter()
            .map(|model| {
                let branch = tabula_storage::backend_for(model.config.clone()).default_state();
                (Arc::clone(&model.name), branch)
            })
            .collect()
    }

    pub(crate) fn by_slot(&self, slot: usize) -> &ModelSchema {
        &self.models[slot]
    }
}
