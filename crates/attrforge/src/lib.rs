//! # Attrforge Architecture
//!
//! Attrforge is a **declarative attribute-metadata engine**. An object type is
//! described once, as a table of attribute definitions; the engine compiles
//! that table into an immutable descriptor and uses it to move data between its
//! raw, external form (`serde_json` maps) and typed domain objects
//! ([`Entity`]).
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Registry (registry.rs)                                     │
//! │  - Explicit root: config, property types, transformers      │
//! │  - Builds and catalogs DataTypes                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  DataType facade (data_type.rs)                             │
//! │  - hydrate / extract / get / set / create / update / delete │
//! │  - Wraps stage failures with direction and attribute        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Compiled artifacts                                         │
//! │  - AttributeFactory → AttributeMap (factory.rs)             │
//! │  - DataTypeDescriptor + capabilities (descriptor.rs)        │
//! │  - Pipeline of middleware stages (pipeline.rs)              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Plugins                                                    │
//! │  - PropertyTypes (property_type/)                           │
//! │  - ValueTransformers (transform/)                           │
//! │  - AttributeResolvers (resolver/)                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! DefinitionTable ─▶ AttributeFactory ─▶ AttributeMap ─▶ DataTypeDescriptor
//!                                                              │
//!        raw map ─▶ Pipeline::hydrate (per-call context) ─▶ Entity
//!         Entity ─▶ Pipeline::extract (per-call context) ─▶ raw map
//! ```
//!
//! Everything above the per-call [`AttributesContext`] is built once and
//! shared behind `Arc`. Compiled attributes are memoized, transformers are
//! resolved once per attribute, and nothing is global: two registries never
//! share state.
//!
//! ## External Collaborators
//!
//! Storage ([`Store`], [`ObjectLookup`]), lifecycle events
//! ([`EventDispatcher`]) and validation ([`Validator`]) are traits. The crate
//! ships [`MemoryStore`] and [`EventLog`] for tests and embedding; database
//! adapters and rule engines live elsewhere.
//!
//! ## Module Overview
//!
//! - [`registry`]: The engine root and data type catalog
//! - [`data_type`]: The per-type facade
//! - [`schema`]: Declarative object type descriptions
//! - [`definition`]: Raw definitions and their normalization
//! - [`factory`]: Attribute compilation
//! - [`property_type`]: The property type plugins
//! - [`capability`]: Typed views over compiled attributes
//! - [`descriptor`]: Compiled data type descriptors
//! - [`pipeline`], [`context`]: Hydration and extraction
//! - [`transform`]: Value conversion
//! - [`resolver`]: Lazy and batched attribute resolution
//! - [`store`], [`events`], [`validation`]: Collaborator seams
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod attribute;
pub mod capability;
pub mod config;
pub mod context;
pub mod data_type;
pub mod definition;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod events;
pub mod factory;
pub mod pipeline;
pub mod property;
pub mod property_type;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod transform;
pub mod validation;
pub mod value;

pub use attribute::{Attribute, AttributeMap};
pub use capability::{
    AccessCapability, Capability, CapabilityKind, DefaultsCapability, MapCapability,
    ResolverCapability, RulesCapability, TransformCapability,
};
pub use config::EngineConfig;
pub use context::{AttributesContext, Slot};
pub use data_type::{DataType, DataTypeBuilder};
pub use definition::{AttributeConfig, Definition, DefinitionTable};
pub use descriptor::DataTypeDescriptor;
pub use entity::Entity;
pub use error::{Error, Result};
pub use events::{Event, EventDispatcher, EventKind, EventLog};
pub use factory::AttributeFactory;
pub use pipeline::{Direction, Middleware, Next, Pipeline};
pub use property::{Overrides, Property, PropertySet, ResolverProperty};
pub use property_type::{PropertyInput, PropertyType, PropertyTypeSet};
pub use registry::{Catalog, Registry, RegistryBuilder};
pub use resolver::{
    AliasResolver, AssociationResolver, AttributeResolver, CallableResolver, DelegateResolver,
    ResolverRegistry,
};
pub use schema::ObjectSchema;
pub use store::{MemoryStore, ObjectLookup, Store};
pub use transform::{Options, TransformerRegistry, ValueTransformer};
pub use validation::{Operation, Validator};
pub use value::{AttrValue, RawMap};
