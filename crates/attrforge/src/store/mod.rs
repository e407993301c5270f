//! # Storage Collaborators
//!
//! The engine never persists anything itself. It talks to storage through two
//! narrow traits:
//!
//! - [`Store`]: writes extracted data and returns the persisted fields, which
//!   the data type hydrates back into the entity (generated keys, timestamps).
//! - [`ObjectLookup`]: equality lookups used by association resolvers.
//!
//! ## Implementations
//!
//! - [`memory::MemoryStore`]: in-memory tables, for tests and embedding.
//!
//! Database, file, or ORM adapters live outside this crate and implement the
//! same traits.

use crate::entity::Entity;
use crate::error::Result;
use crate::value::{AttrValue, RawMap};

pub mod memory;

pub use memory::{MemoryLookup, MemoryStore};

/// Abstract interface for persisting extracted data.
///
/// Every method receives the data type name and the extracted raw data and
/// returns the fields as persisted.
pub trait Store: Send + Sync {
    /// Insert a new record.
    fn create(&self, data_type: &str, data: &RawMap) -> Result<RawMap>;

    /// Update an existing record.
    fn update(&self, data_type: &str, data: &RawMap) -> Result<RawMap>;

    /// Delete a record, returning what was removed.
    fn delete(&self, data_type: &str, data: &RawMap) -> Result<RawMap>;
}

/// Equality lookups over one data type's records.
pub trait ObjectLookup: Send + Sync {
    /// First object whose `attribute` equals `value`.
    fn find_by(&self, attribute: &str, value: &AttrValue) -> Result<Option<Entity>>;

    /// All objects whose `attribute` equals `value`.
    fn get_where(&self, attribute: &str, value: &AttrValue) -> Result<Vec<Entity>>;

    /// All objects whose `attribute` equals any of `values`.
    ///
    /// The default issues one [`ObjectLookup::get_where`] per value.
    fn get_where_in(&self, attribute: &str, values: &[AttrValue]) -> Result<Vec<Entity>> {
        let mut found = Vec::new();
        for value in values {
            found.extend(self.get_where(attribute, value)?);
        }
        Ok(found)
    }
}
