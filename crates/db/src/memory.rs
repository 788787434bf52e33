//! In-process store that behaves like a MongoDB server for the handful of
//! administrative commands the provisioner issues.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chillpanda_kernel::IndexSpec;
use mongodb::bson::{Bson, Document};
use parking_lot::Mutex;

use crate::error::{DbError, DbResult};
use crate::store::{ExistingIndex, SchemaStore, ID_INDEX_NAME};

#[derive(Debug, Default)]
struct MemoryCollection {
    indexes: Vec<ExistingIndex>,
    documents: Vec<Document>,
}

impl MemoryCollection {
    fn new() -> Self {
        Self {
            indexes: vec![ExistingIndex {
                name: ID_INDEX_NAME.to_string(),
                spec: Some(IndexSpec::new().asc("_id")),
            }],
            documents: Vec::new(),
        }
    }
}

type Databases = BTreeMap<String, BTreeMap<String, MemoryCollection>>;

/// Clones share state, so a test can keep a handle while the provisioner
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    databases: Arc<Mutex<Databases>>,
    database: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn selected(&self) -> DbResult<&str> {
        self.database.as_deref().ok_or(DbError::NoDatabaseSelected)
    }

    /// Insert a record, enforcing every unique index on the collection.
    /// Missing fields index as `null`, as on the server.
    pub fn insert_one(&self, collection: &str, document: Document) -> DbResult<()> {
        let database = self.selected()?;
        let mut databases = self.databases.lock();
        let target = databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_insert_with(MemoryCollection::new);

        for index in &target.indexes {
            let Some(spec) = index.spec.as_ref().filter(|spec| spec.unique) else {
                continue;
            };
            let key = index_key(spec, &document);
            if target
                .documents
                .iter()
                .any(|existing| index_key(spec, existing) == key)
            {
                return Err(DbError::DuplicateKey {
                    collection: collection.to_string(),
                    index: index.name.clone(),
                });
            }
        }

        target.documents.push(document);
        Ok(())
    }

    pub fn document_count(&self, collection: &str) -> DbResult<usize> {
        let database = self.selected()?;
        let databases = self.databases.lock();
        Ok(databases
            .get(database)
            .and_then(|collections| collections.get(collection))
            .map_or(0, |c| c.documents.len()))
    }
}

fn index_key(spec: &IndexSpec, document: &Document) -> Vec<Bson> {
    spec.keys
        .iter()
        .map(|(field, _)| document.get(field).cloned().unwrap_or(Bson::Null))
        .collect()
}

#[async_trait]
impl SchemaStore for MemoryStore {
    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }

    fn select_database(&mut self, name: &str) {
        self.database = Some(name.to_string());
    }

    fn database_name(&self) -> Option<&str> {
        self.database.as_deref()
    }

    async fn collection_names(&self) -> DbResult<Vec<String>> {
        let database = self.selected()?;
        let databases = self.databases.lock();
        Ok(databases
            .get(database)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_collection(&self, name: &str) -> DbResult<()> {
        let database = self.selected()?;
        let mut databases = self.databases.lock();
        let collections = databases.entry(database.to_string()).or_default();
        if collections.contains_key(name) {
            return Err(DbError::NamespaceExists(name.to_string()));
        }
        collections.insert(name.to_string(), MemoryCollection::new());
        Ok(())
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> DbResult<String> {
        let database = self.selected()?;
        let name = index.name();
        let mut databases = self.databases.lock();
        let target = databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_insert_with(MemoryCollection::new);

        for existing in &target.indexes {
            let same_name = existing.name == name;
            let same_keys = existing
                .spec
                .as_ref()
                .is_some_and(|spec| spec.same_keys(index));
            if !same_name && !same_keys {
                continue;
            }
            if same_name && existing.spec.as_ref().is_some_and(|spec| spec.matches(index)) {
                return Ok(name);
            }
            return Err(DbError::IndexConflict {
                collection: collection.to_string(),
                name,
                existing: existing.describe(),
            });
        }

        // a unique index cannot be built over data that already repeats a key
        if index.unique {
            let keys: Vec<_> = target.documents.iter().map(|d| index_key(index, d)).collect();
            if keys
                .iter()
                .enumerate()
                .any(|(position, key)| keys[..position].contains(key))
            {
                return Err(DbError::DuplicateKey {
                    collection: collection.to_string(),
                    index: name,
                });
            }
        }

        target.indexes.push(ExistingIndex {
            name: name.clone(),
            spec: Some(index.clone()),
        });
        Ok(name)
    }

    async fn list_indexes(&self, collection: &str) -> DbResult<Vec<ExistingIndex>> {
        let database = self.selected()?;
        let databases = self.databases.lock();
        Ok(databases
            .get(database)
            .and_then(|collections| collections.get(collection))
            .map(|c| c.indexes.clone())
            .unwrap_or_default())
    }
}
