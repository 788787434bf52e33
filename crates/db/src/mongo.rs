//! MongoDB backend built on the official async driver.

use std::time::Duration;

use async_trait::async_trait;
use chillpanda_kernel::settings::DatabaseSettings;
use chillpanda_kernel::{IndexSpec, SortOrder};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{ClientOptions, IndexOptions},
    Client, Database, IndexModel,
};

use crate::error::{DbError, DbResult};
use crate::store::{ExistingIndex, SchemaStore};

pub struct MongoStore {
    client: Client,
    database: Option<Database>,
}

impl MongoStore {
    /// Build a client from settings. No network traffic happens until the
    /// first command; call [`SchemaStore::ping`] to fail fast.
    pub async fn connect(settings: &DatabaseSettings) -> DbResult<Self> {
        let mut options = ClientOptions::parse(&settings.uri)
            .await
            .map_err(|source| DbError::mongo("parse connection string", source))?;
        options.server_selection_timeout =
            Some(Duration::from_millis(settings.server_selection_timeout_ms));
        options.app_name = Some(settings.app_name.clone());

        let client = Client::with_options(options)
            .map_err(|source| DbError::mongo("build client", source))?;

        tracing::debug!(
            target: "chillpanda-db",
            timeout_ms = settings.server_selection_timeout_ms,
            "mongodb client created"
        );

        Ok(Self {
            client,
            database: None,
        })
    }

    fn database(&self) -> DbResult<&Database> {
        self.database.as_ref().ok_or(DbError::NoDatabaseSelected)
    }
}

#[async_trait]
impl SchemaStore for MongoStore {
    async fn ping(&self) -> DbResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| DbError::mongo("ping", source))?;
        Ok(())
    }

    fn select_database(&mut self, name: &str) {
        self.database = Some(self.client.database(name));
    }

    fn database_name(&self) -> Option<&str> {
        self.database.as_ref().map(|db| db.name())
    }

    async fn collection_names(&self) -> DbResult<Vec<String>> {
        self.database()?
            .list_collection_names()
            .await
            .map_err(|source| DbError::mongo("list collections", source))
    }

    async fn create_collection(&self, name: &str) -> DbResult<()> {
        self.database()?
            .create_collection(name)
            .await
            .map_err(|source| DbError::mongo(format!("create collection '{}'", name), source))
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> DbResult<String> {
        let result = self
            .database()?
            .collection::<Document>(collection)
            .create_index(index_model(index))
            .await
            .map_err(|source| {
                DbError::mongo(
                    format!("create index '{}' on '{}'", index.name(), collection),
                    source,
                )
            })?;
        Ok(result.index_name)
    }

    async fn list_indexes(&self, collection: &str) -> DbResult<Vec<ExistingIndex>> {
        let operation = || format!("list indexes on '{}'", collection);
        let models: Vec<IndexModel> = self
            .database()?
            .collection::<Document>(collection)
            .list_indexes()
            .await
            .map_err(|source| DbError::mongo(operation(), source))?
            .try_collect()
            .await
            .map_err(|source| DbError::mongo(operation(), source))?;

        Ok(models.iter().map(existing_index).collect())
    }
}

/// Translate a declaration into a driver index model with an explicit name.
pub fn index_model(index: &IndexSpec) -> IndexModel {
    let mut keys = Document::new();
    for (field, order) in &index.keys {
        keys.insert(field.clone(), order.as_i32());
    }

    let mut options = IndexOptions::default();
    options.name = Some(index.name());
    if index.unique {
        options.unique = Some(true);
    }

    IndexModel::builder().keys(keys).options(options).build()
}

fn existing_index(model: &IndexModel) -> ExistingIndex {
    let options = model.options.as_ref();
    let unique = options.and_then(|o| o.unique).unwrap_or(false);

    let keys: Option<Vec<(String, SortOrder)>> = model
        .keys
        .iter()
        .map(|(field, value)| Some((field.clone(), key_direction(value)?)))
        .collect();
    let spec = keys.map(|keys| IndexSpec { keys, unique });

    let name = options
        .and_then(|o| o.name.clone())
        .or_else(|| spec.as_ref().map(IndexSpec::name))
        .unwrap_or_default();

    ExistingIndex { name, spec }
}

fn key_direction(value: &Bson) -> Option<SortOrder> {
    let number = match value {
        Bson::Int32(v) => f64::from(*v),
        Bson::Int64(v) => *v as f64,
        Bson::Double(v) => *v,
        _ => return None,
    };
    SortOrder::from_number(number)
}
