use async_trait::async_trait;
use chillpanda_kernel::IndexSpec;

use crate::error::DbResult;

/// Name of the index every collection carries on `_id`.
pub const ID_INDEX_NAME: &str = "_id_";

/// An index as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingIndex {
    pub name: String,
    /// `None` when the key pattern uses something other than a plain
    /// direction (text, hashed, geo).
    pub spec: Option<IndexSpec>,
}

impl ExistingIndex {
    pub fn is_id_index(&self) -> bool {
        self.name == ID_INDEX_NAME
    }

    pub fn describe(&self) -> String {
        match &self.spec {
            Some(spec) => spec.to_string(),
            None => format!("'{}' (unsupported key pattern)", self.name),
        }
    }
}

/// Administrative operations the provisioner needs from a database server.
///
/// Everything except `ping` and `select_database` works on the selected
/// database and fails with [`crate::DbError::NoDatabaseSelected`] otherwise.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Round-trip to the server to prove connectivity.
    async fn ping(&self) -> DbResult<()>;

    fn select_database(&mut self, name: &str);

    fn database_name(&self) -> Option<&str>;

    async fn collection_names(&self) -> DbResult<Vec<String>>;

    /// Fails if the collection already exists.
    async fn create_collection(&self, name: &str) -> DbResult<()>;

    /// Returns the index name. Identical re-declaration succeeds; a
    /// conflicting one fails.
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> DbResult<String>;

    async fn list_indexes(&self, collection: &str) -> DbResult<Vec<ExistingIndex>>;
}
