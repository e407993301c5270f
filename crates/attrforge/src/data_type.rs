//! # Data Types
//!
//! A [`DataType`] is the compiled facade of one object type: its descriptor,
//! its pipeline, and the collaborators it writes through. Everything it holds
//! is immutable after [`DataTypeBuilder::build`]; per-call state lives in an
//! [`AttributesContext`].
//!
//! ## Reading Attributes
//!
//! [`DataType::get`] prefers resolvers over stored values:
//!
//! 1. A cacheable resolver with a stored value returns it (cache hit).
//! 2. Otherwise the resolver runs; cacheable results are stored without
//!    marking the attribute modified.
//! 3. Without a resolver the stored value is returned, null for a declared
//!    attribute with no value, and [`Error::UndefinedAttribute`] otherwise.
//!
//! ## Writes
//!
//! `create`, `update` and `delete` extract the entity, hand the data to the
//! [`Validator`] and the `Before*` event, write through the [`Store`], fire
//! the `After*` event, and (for create and update) hydrate the persisted
//! fields back into the entity.

use crate::capability::{AccessCapability, MapCapability, ResolverCapability, RulesCapability};
use crate::config::EngineConfig;
use crate::context::AttributesContext;
use crate::definition::DefinitionTable;
use crate::descriptor::DataTypeDescriptor;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::events::{Event, EventDispatcher, EventKind};
use crate::factory::AttributeFactory;
use crate::pipeline::{Direction, Pipeline};
use crate::property_type::PropertyTypeSet;
use crate::registry::Catalog;
use crate::resolver::ResolverRegistry;
use crate::store::Store;
use crate::transform::{NestedTypes, TransformerRegistry};
use crate::validation::{Operation, Validator};
use crate::value::{AttrValue, RawMap};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

pub struct DataType {
    name: String,
    descriptor: DataTypeDescriptor,
    pipeline: Pipeline,
    config: EngineConfig,
    catalog: Weak<Catalog>,
    store: Option<Arc<dyn Store>>,
    events: Option<Arc<dyn EventDispatcher>>,
    validator: Option<Arc<dyn Validator>>,
}

impl DataType {
    /// A builder using the default property types and transformers, outside
    /// any registry.
    pub fn builder(name: impl Into<String>) -> DataTypeBuilder {
        let config = EngineConfig::default();
        DataTypeBuilder::new(
            name,
            Arc::new(PropertyTypeSet::defaults()),
            Arc::new(TransformerRegistry::with_defaults(config.clone())),
            config,
            None,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &DataTypeDescriptor {
        &self.descriptor
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Declared attribute names in declaration order.
    pub fn attribute_names(&self) -> &[String] {
        self.descriptor.attribute_names()
    }

    /// Raw data → entity, then auto-resolve.
    pub fn hydrate(&self, raw: RawMap) -> Result<Entity> {
        let mut entity = self.run_hydration(raw)?;
        self.auto_resolve(std::slice::from_mut(&mut entity))?;
        Ok(entity)
    }

    /// Hydrate many rows, auto-resolving each attribute once for the whole
    /// batch.
    pub fn hydrate_many<I>(&self, rows: I) -> Result<Vec<Entity>>
    where
        I: IntoIterator<Item = RawMap>,
    {
        let mut entities = rows
            .into_iter()
            .map(|raw| self.run_hydration(raw))
            .collect::<Result<Vec<_>>>()?;
        self.auto_resolve(&mut entities)?;
        Ok(entities)
    }

    /// Entity → raw data.
    pub fn extract(&self, entity: &Entity) -> Result<RawMap> {
        self.extract_map(entity.values())
    }

    /// Domain values → raw data.
    pub fn extract_map(&self, values: BTreeMap<String, AttrValue>) -> Result<RawMap> {
        let catalog = self.catalog.upgrade();
        let nested = catalog.as_deref().map(|c| c as &dyn NestedTypes);
        let mut cx = AttributesContext::from_values(&self.descriptor, values).with_nested(nested);
        self.pipeline
            .extract(&mut cx)
            .map_err(|e| self.pipeline_error(Direction::Extract, e))?;
        Ok(self.drop_nulls(cx.into_raw()))
    }

    /// Stored values with key mapping applied and no transformation.
    pub fn extract_data(&self, entity: &Entity) -> RawMap {
        let map = self.descriptor.capability::<MapCapability>();
        let data = map.map_outbound(entity.to_json()).into_iter().collect();
        self.drop_nulls(data)
    }

    /// Read an attribute, running its resolver when needed.
    pub fn get(&self, entity: &mut Entity, name: &str) -> Result<AttrValue> {
        let resolvers = self.descriptor.capability::<ResolverCapability>();
        if let Some(property) = resolvers.get(name) {
            if property.is_cacheable() {
                if let Some(cached) = entity.value(name) {
                    trace!(data_type = %self.name, attribute = name, "resolver cache hit");
                    return Ok(cached.clone());
                }
            }
            let value = resolvers.resolve(name, entity)?;
            if property.is_cacheable() {
                entity.store(name, value.clone());
            }
            return Ok(value);
        }

        if !self.descriptor.has_attribute(name) {
            return Err(self.undefined(name));
        }
        Ok(entity.value(name).cloned().unwrap_or(AttrValue::Null))
    }

    /// Resolve `name` for every entity with one batch call.
    ///
    /// Cacheable results are stored in their entities.
    pub fn resolve_many(&self, entities: &mut [Entity], name: &str) -> Result<Vec<AttrValue>> {
        let resolvers = self.descriptor.capability::<ResolverCapability>();
        let cacheable = resolvers.require(name)?.is_cacheable();
        let values = {
            let owners: Vec<&Entity> = entities.iter().collect();
            resolvers.resolve_many(name, &owners)?
        };
        if cacheable {
            for (entity, value) in entities.iter_mut().zip(&values) {
                entity.store(name, value.clone());
            }
        }
        Ok(values)
    }

    /// Write an attribute, honouring `writable`.
    pub fn set(&self, entity: &mut Entity, name: &str, value: impl Into<AttrValue>) -> Result<()> {
        if !self.descriptor.has_attribute(name) {
            return Err(self.undefined(name));
        }
        if !self.descriptor.capability::<AccessCapability>().is_writable(name) {
            return Err(Error::NotWritable {
                class: self.name.clone(),
                attribute: name.to_string(),
            });
        }
        entity.set(name, value);
        Ok(())
    }

    /// Persist a new entity and merge back the persisted fields.
    pub fn create(&self, entity: &mut Entity) -> Result<()> {
        let persisted = self.write(
            entity,
            Operation::Create,
            (EventKind::BeforeCreate, EventKind::AfterCreate),
            |store, name, data| store.create(name, data),
        )?;
        entity.absorb(self.hydrate(persisted)?);
        Ok(())
    }

    /// Persist changes and merge back the persisted fields.
    pub fn update(&self, entity: &mut Entity) -> Result<()> {
        let persisted = self.write(
            entity,
            Operation::Update,
            (EventKind::BeforeUpdate, EventKind::AfterUpdate),
            |store, name, data| store.update(name, data),
        )?;
        entity.absorb(self.hydrate(persisted)?);
        Ok(())
    }

    /// Delete the entity's record, returning what the store removed.
    pub fn delete(&self, entity: &Entity) -> Result<RawMap> {
        self.write(
            entity,
            Operation::Delete,
            (EventKind::BeforeDelete, EventKind::AfterDelete),
            |store, name, data| store.delete(name, data),
        )
    }

    fn write<F>(
        &self,
        entity: &Entity,
        operation: Operation,
        (before, after): (EventKind, EventKind),
        apply: F,
    ) -> Result<RawMap>
    where
        F: FnOnce(&dyn Store, &str, &RawMap) -> Result<RawMap>,
    {
        let store = self
            .store
            .as_deref()
            .ok_or_else(|| Error::config(format!("data type '{}' has no store", self.name)))?;

        let data = self.extract(entity)?;
        if let Some(validator) = &self.validator {
            let rules = self.descriptor.capability::<RulesCapability>();
            validator.validate(&self.name, operation, &data, rules)?;
        }
        self.dispatch(before, data.clone())?;

        debug!(data_type = %self.name, %operation, "store write");
        let persisted = apply(store, &self.name, &data)?;

        self.dispatch(after, persisted.clone())?;
        Ok(persisted)
    }

    fn dispatch(&self, kind: EventKind, data: RawMap) -> Result<()> {
        match &self.events {
            Some(events) => events.dispatch(&Event::new(kind, self.name.clone(), data)),
            None => Ok(()),
        }
    }

    fn run_hydration(&self, raw: RawMap) -> Result<Entity> {
        let catalog = self.catalog.upgrade();
        let nested = catalog.as_deref().map(|c| c as &dyn NestedTypes);
        let mut cx = AttributesContext::from_raw(&self.descriptor, raw).with_nested(nested);
        self.pipeline
            .hydrate(&mut cx)
            .map_err(|e| self.pipeline_error(Direction::Hydrate, e))?;
        Ok(Entity::from_values(self.name.clone(), cx.into_values()))
    }

    /// Resolve auto-resolved attributes for a batch.
    ///
    /// Values of non-cacheable resolvers are stored as snapshots; `get`
    /// still recomputes them.
    fn auto_resolve(&self, entities: &mut [Entity]) -> Result<()> {
        let resolvers = self.descriptor.capability::<ResolverCapability>();
        for name in resolvers.auto_resolved() {
            let values = {
                let owners: Vec<&Entity> = entities.iter().collect();
                resolvers.resolve_many(name, &owners)?
            };
            for (entity, value) in entities.iter_mut().zip(values) {
                entity.store(name, value);
            }
        }
        Ok(())
    }

    fn drop_nulls(&self, mut data: RawMap) -> RawMap {
        if !self.config.extract_nulls {
            data.retain(|_, value| !value.is_null());
        }
        data
    }

    fn pipeline_error(&self, direction: Direction, source: Error) -> Error {
        Error::Pipeline {
            direction,
            data_type: self.name.clone(),
            attribute: source.attribute().map(String::from),
            source: Box::new(source),
        }
    }

    fn undefined(&self, name: &str) -> Error {
        Error::UndefinedAttribute {
            class: self.name.clone(),
            attribute: name.to_string(),
        }
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataType")
            .field("name", &self.name)
            .field("attributes", &self.descriptor.attribute_names())
            .field("pipeline", &self.pipeline.stage_names())
            .field("store", &self.store.is_some())
            .field("events", &self.events.is_some())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// Collects definitions and collaborators for one [`DataType`].
pub struct DataTypeBuilder {
    name: String,
    definitions: DefinitionTable,
    resolvers: ResolverRegistry,
    store: Option<Arc<dyn Store>>,
    events: Option<Arc<dyn EventDispatcher>>,
    validator: Option<Arc<dyn Validator>>,
    property_types: Arc<PropertyTypeSet>,
    transformers: Arc<TransformerRegistry>,
    config: EngineConfig,
    catalog: Option<Arc<Catalog>>,
}

impl DataTypeBuilder {
    pub(crate) fn new(
        name: impl Into<String>,
        property_types: Arc<PropertyTypeSet>,
        transformers: Arc<TransformerRegistry>,
        config: EngineConfig,
        catalog: Option<Arc<Catalog>>,
    ) -> Self {
        Self {
            name: name.into(),
            definitions: DefinitionTable::new(),
            resolvers: ResolverRegistry::new(),
            store: None,
            events: None,
            validator: None,
            property_types,
            transformers,
            config,
            catalog,
        }
    }

    pub fn definitions(mut self, definitions: DefinitionTable) -> Self {
        self.definitions = definitions;
        self
    }

    pub fn resolvers(mut self, resolvers: ResolverRegistry) -> Self {
        self.resolvers = resolvers;
        self
    }

    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventDispatcher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Compile the attributes, build the descriptor and pipeline, and
    /// register the data type with its registry, if any.
    pub fn build(self) -> Result<Arc<DataType>> {
        let factory = AttributeFactory::new(
            self.name.clone(),
            Arc::clone(&self.property_types),
            self.definitions,
        )
        .with_resolvers(self.resolvers)
        .strict(self.config.strict_definitions);
        let attributes = factory.attributes()?.clone();

        let descriptor = DataTypeDescriptor::build(
            self.name.clone(),
            attributes,
            &self.property_types,
            &self.transformers,
            &self.config,
        )?;
        let pipeline = self.property_types.pipeline();
        debug!(
            data_type = %self.name,
            stages = ?pipeline.stage_names(),
            "built data type"
        );

        let data_type = Arc::new(DataType {
            name: self.name,
            descriptor,
            pipeline,
            config: self.config,
            catalog: self.catalog.as_ref().map(Arc::downgrade).unwrap_or_default(),
            store: self.store,
            events: self.events,
            validator: self.validator,
        });
        if let Some(catalog) = &self.catalog {
            catalog.insert(Arc::clone(&data_type))?;
        }
        Ok(data_type)
    }
}

impl fmt::Debug for DataTypeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTypeBuilder")
            .field("name", &self.name)
            .field("definitions", &self.definitions.len())
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}
