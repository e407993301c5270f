use super::{ObjectLookup, Store};
use crate::data_type::DataType;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::value::{AttrValue, RawMap};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

/// In-memory tables keyed by data type name.
///
/// Uses an `RwLock` because lookups are shared with resolvers, which must be
/// `Send + Sync`. Records are identified by their `id` field; `create` assigns
/// a sequential integer id when the data has none.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<RawMap>>>,
    next_id: AtomicI64,
    simulate_write_error: RwLock<bool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            simulate_write_error: RwLock::new(false),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) -> Result<()> {
        let mut flag = self.simulate_write_error.write().map_err(|_| poisoned())?;
        *flag = simulate;
        Ok(())
    }

    /// All rows of a table, in insertion order.
    pub fn rows(&self, data_type: &str) -> Result<Vec<RawMap>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.get(data_type).cloned().unwrap_or_default())
    }

    /// Lookup over a table returning untyped entities.
    pub fn lookup(self: &Arc<Self>, data_type: &str) -> Arc<dyn ObjectLookup> {
        Arc::new(MemoryLookup {
            store: Arc::clone(self),
            table: data_type.to_string(),
            data_type: None,
        })
    }

    /// Lookup over a table that hydrates rows through `data_type`.
    pub fn typed_lookup(self: &Arc<Self>, data_type: Arc<DataType>) -> Arc<dyn ObjectLookup> {
        Arc::new(MemoryLookup {
            store: Arc::clone(self),
            table: data_type.name().to_string(),
            data_type: Some(data_type),
        })
    }

    fn check_writable(&self) -> Result<()> {
        let simulate = self.simulate_write_error.read().map_err(|_| poisoned())?;
        if *simulate {
            return Err(Error::Store("Simulated write error".to_string()));
        }
        Ok(())
    }

    fn position(rows: &[RawMap], id: &Value) -> Option<usize> {
        rows.iter().position(|row| row.get("id") == Some(id))
    }
}

fn poisoned() -> Error {
    Error::Store("memory store lock poisoned".to_string())
}

fn require_id<'a>(data_type: &str, data: &'a RawMap) -> Result<&'a Value> {
    data.get("id")
        .filter(|id| !id.is_null())
        .ok_or_else(|| Error::Store(format!("{data_type} record has no id")))
}

impl Store for MemoryStore {
    fn create(&self, data_type: &str, data: &RawMap) -> Result<RawMap> {
        self.check_writable()?;
        let mut row = data.clone();
        if row.get("id").map_or(true, Value::is_null) {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            row.insert("id".to_string(), Value::from(id));
        }

        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let table = tables.entry(data_type.to_string()).or_default();
        if let Some(id) = row.get("id") {
            if Self::position(table, id).is_some() {
                return Err(Error::Store(format!("{data_type} with id {id} already exists")));
            }
        }
        table.push(row.clone());
        Ok(row)
    }

    fn update(&self, data_type: &str, data: &RawMap) -> Result<RawMap> {
        self.check_writable()?;
        let id = require_id(data_type, data)?;

        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let table = tables.entry(data_type.to_string()).or_default();
        let index = Self::position(table, id)
            .ok_or_else(|| Error::Store(format!("{data_type} with id {id} not found")))?;

        let row = &mut table[index];
        for (key, value) in data {
            row.insert(key.clone(), value.clone());
        }
        Ok(row.clone())
    }

    fn delete(&self, data_type: &str, data: &RawMap) -> Result<RawMap> {
        self.check_writable()?;
        let id = require_id(data_type, data)?;

        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let table = tables.entry(data_type.to_string()).or_default();
        let index = Self::position(table, id)
            .ok_or_else(|| Error::Store(format!("{data_type} with id {id} not found")))?;
        Ok(table.remove(index))
    }
}

/// [`ObjectLookup`] over one [`MemoryStore`] table.
pub struct MemoryLookup {
    store: Arc<MemoryStore>,
    table: String,
    data_type: Option<Arc<DataType>>,
}

impl MemoryLookup {
    fn to_entity(&self, row: RawMap) -> Result<Entity> {
        match &self.data_type {
            Some(data_type) => data_type.hydrate(row),
            None => Ok(Entity::from_raw(self.table.clone(), row)),
        }
    }

    fn matching<'a>(
        rows: &'a [RawMap],
        attribute: &'a str,
        values: &'a [AttrValue],
    ) -> impl Iterator<Item = &'a RawMap> + 'a {
        rows.iter().filter(move |row| {
            row.get(attribute).is_some_and(|raw| {
                let candidate = AttrValue::from_json(raw.clone());
                values.iter().any(|v| v.matches_key(&candidate))
            })
        })
    }
}

impl ObjectLookup for MemoryLookup {
    fn find_by(&self, attribute: &str, value: &AttrValue) -> Result<Option<Entity>> {
        let rows = self.store.rows(&self.table)?;
        let values = std::slice::from_ref(value);
        let found = Self::matching(&rows, attribute, values)
            .next()
            .cloned()
            .map(|row| self.to_entity(row))
            .transpose();
        found
    }

    fn get_where(&self, attribute: &str, value: &AttrValue) -> Result<Vec<Entity>> {
        self.get_where_in(attribute, std::slice::from_ref(value))
    }

    fn get_where_in(&self, attribute: &str, values: &[AttrValue]) -> Result<Vec<Entity>> {
        let rows = self.store.rows(&self.table)?;
        Self::matching(&rows, attribute, values)
            .cloned()
            .map(|row| self.to_entity(row))
            .collect()
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::definition::DefinitionTable;
    use crate::registry::Registry;
    use crate::resolver::{AssociationResolver, ResolverRegistry};
    use crate::schema::ObjectSchema;
    use serde_json::json;

    /// `Author`: `id`, and `name` stored as `full_name`.
    pub struct AuthorSchema;

    impl ObjectSchema for AuthorSchema {
        fn name(&self) -> &str {
            "Author"
        }

        fn definitions(&self) -> DefinitionTable {
            DefinitionTable::new()
                .shorthand("id:int")
                .config("name:string", json!({"map": "full_name"}))
        }
    }

    /// `Article`, with a has-one `author` resolved through `authors`.
    pub struct ArticleSchema {
        pub authors: Arc<dyn ObjectLookup>,
    }

    impl ObjectSchema for ArticleSchema {
        fn name(&self) -> &str {
            "Article"
        }

        fn definitions(&self) -> DefinitionTable {
            DefinitionTable::new()
                .shorthand("id:int")
                .config("title:string", json!({"default": "Untitled"}))
                .config(
                    "publishDate:datetime",
                    json!({"map": "publish_date", "transform.format": "Y-m-d"}),
                )
                .config("authorId:fk", json!({"map": "author_id"}))
        }

        fn resolvers(&self) -> Result<ResolverRegistry> {
            let author =
                AssociationResolver::has_one("Author", "id", "authorId", Arc::clone(&self.authors));
            ResolverRegistry::new().add("author", Arc::new(author))
        }
    }

    pub struct StoreFixture {
        pub store: Arc<MemoryStore>,
        pub registry: Registry,
        pub authors: Arc<DataType>,
        pub articles: Arc<DataType>,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let registry = Registry::new();
            let authors = registry
                .schema(&AuthorSchema)
                .and_then(|b| b.store(store.clone()).build())
                .unwrap();
            let articles = registry
                .schema(&ArticleSchema {
                    authors: store.typed_lookup(Arc::clone(&authors)),
                })
                .and_then(|b| b.store(store.clone()).build())
                .unwrap();
            Self {
                store,
                registry,
                authors,
                articles,
            }
        }

        pub fn with_author(self, id: i64, name: &str) -> Self {
            let row = json!({"id": id, "full_name": name});
            self.store
                .create("Author", row.as_object().unwrap())
                .unwrap();
            self
        }

        pub fn with_article(self, id: i64, title: &str, author_id: Option<i64>) -> Self {
            let row = json!({"id": id, "title": title, "author_id": author_id});
            self.store
                .create("Article", row.as_object().unwrap())
                .unwrap();
            self
        }

        /// Stored article rows, hydrated.
        pub fn articles(&self) -> Vec<Entity> {
            let rows = self.store.rows("Article").unwrap();
            self.articles.hydrate_many(rows).unwrap()
        }
    }
}
