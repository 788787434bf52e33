//! Idempotent provisioning of a [`SchemaPlan`] against a [`SchemaStore`].

use std::fmt;

use chillpanda_kernel::schema::{validate_collection_name, validate_database_name};
use chillpanda_kernel::{IndexSpec, SchemaPlan};
use serde::Serialize;

use crate::error::{DbError, DbResult};
use crate::store::SchemaStore;

/// Outcome of a single idempotent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ensured {
    Created,
    AlreadyPresent,
}

impl fmt::Display for Ensured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ensured::Created => f.write_str("created"),
            Ensured::AlreadyPresent => f.write_str("already present"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionOutcome {
    pub collection: String,
    pub outcome: Ensured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexOutcome {
    pub collection: String,
    pub index: String,
    pub outcome: Ensured,
}

/// What a provisioning run did, step by step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub database: String,
    pub collections: Vec<CollectionOutcome>,
    pub indexes: Vec<IndexOutcome>,
}

impl ProvisionReport {
    pub fn created_count(&self) -> usize {
        let collections = self
            .collections
            .iter()
            .filter(|c| c.outcome == Ensured::Created)
            .count();
        let indexes = self
            .indexes
            .iter()
            .filter(|i| i.outcome == Ensured::Created)
            .count();
        collections + indexes
    }

    /// True when the run found everything already in place.
    pub fn is_noop(&self) -> bool {
        self.created_count() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexMismatch {
    pub collection: String,
    pub index: String,
    pub expected: IndexSpec,
    /// `None` when the existing index uses a key pattern we cannot express.
    pub found: Option<IndexSpec>,
}

/// Drift between a plan and the live database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub database: String,
    pub missing_collections: Vec<String>,
    pub missing_indexes: Vec<(String, IndexSpec)>,
    pub mismatched_indexes: Vec<IndexMismatch>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.missing_collections.is_empty()
            && self.missing_indexes.is_empty()
            && self.mismatched_indexes.is_empty()
    }
}

pub struct Provisioner<S> {
    store: S,
}

impl<S: SchemaStore> Provisioner<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn select_database(&mut self, name: &str) -> DbResult<()> {
        validate_database_name(name).map_err(DbError::invalid_name)?;
        self.store.select_database(name);
        tracing::info!(target: "chillpanda-db", database = name, "database selected");
        Ok(())
    }

    /// Create `name` unless it already exists. Existing data is untouched.
    pub async fn ensure_collection(&self, name: &str) -> DbResult<Ensured> {
        validate_collection_name(name).map_err(DbError::invalid_name)?;

        let existing = self.store.collection_names().await?;
        let outcome = if existing.iter().any(|c| c == name) {
            Ensured::AlreadyPresent
        } else {
            self.store.create_collection(name).await?;
            Ensured::Created
        };

        tracing::info!(
            target: "chillpanda-db",
            collection = name,
            %outcome,
            "collection ensured"
        );
        Ok(outcome)
    }

    /// Declare `index` on `collection`. An identical index is left alone; a
    /// conflicting one makes the store fail.
    pub async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> DbResult<Ensured> {
        validate_collection_name(collection).map_err(DbError::invalid_name)?;
        index.validate().map_err(DbError::invalid_index)?;

        let name = index.name();
        let collection_exists = self
            .store
            .collection_names()
            .await?
            .iter()
            .any(|c| c == collection);

        let already_present = collection_exists
            && self
                .store
                .list_indexes(collection)
                .await?
                .iter()
                .any(|existing| {
                    existing.name == name
                        && existing.spec.as_ref().is_some_and(|spec| spec.matches(index))
                });

        let outcome = if already_present {
            Ensured::AlreadyPresent
        } else {
            self.store.create_index(collection, index).await?;
            Ensured::Created
        };

        tracing::info!(
            target: "chillpanda-db",
            collection,
            index = %name,
            keys = %index,
            %outcome,
            "index ensured"
        );
        Ok(outcome)
    }

    /// Log and return the success line. Call only after every step succeeded.
    pub fn announce_completion(&self, display_name: &str) -> String {
        let message = format!("✅ MongoDB initialized for {}", display_name);
        tracing::info!(
            target: "chillpanda-db",
            database = self.store.database_name().unwrap_or_default(),
            "{}",
            message
        );
        message
    }

    /// Select the plan's database, ensure every collection, then every index.
    /// The first failure aborts the remaining steps.
    pub async fn provision(&mut self, plan: &SchemaPlan) -> DbResult<ProvisionReport> {
        self.select_database(&plan.database)?;

        let mut report = ProvisionReport {
            database: plan.database.clone(),
            collections: Vec::with_capacity(plan.collections.len()),
            indexes: Vec::with_capacity(plan.index_count()),
        };

        for collection in &plan.collections {
            let outcome = self.ensure_collection(&collection.name).await?;
            report.collections.push(CollectionOutcome {
                collection: collection.name.clone(),
                outcome,
            });
        }

        for collection in &plan.collections {
            for index in &collection.indexes {
                let outcome = self.ensure_index(&collection.name, index).await?;
                report.indexes.push(IndexOutcome {
                    collection: collection.name.clone(),
                    index: index.name(),
                    outcome,
                });
            }
        }

        tracing::info!(
            target: "chillpanda-db",
            database = %plan.database,
            created = report.created_count(),
            "provisioning finished"
        );
        Ok(report)
    }

    /// Compare the live database with the plan without changing anything.
    /// The `_id_` index and undeclared extra indexes are ignored.
    pub async fn verify(&mut self, plan: &SchemaPlan) -> DbResult<VerifyReport> {
        self.select_database(&plan.database)?;

        let mut report = VerifyReport {
            database: plan.database.clone(),
            ..VerifyReport::default()
        };
        let collections = self.store.collection_names().await?;

        for collection in &plan.collections {
            if !collections.iter().any(|c| *c == collection.name) {
                report.missing_collections.push(collection.name.clone());
                for index in &collection.indexes {
                    report
                        .missing_indexes
                        .push((collection.name.clone(), index.clone()));
                }
                continue;
            }

            let existing = self.store.list_indexes(&collection.name).await?;
            for index in &collection.indexes {
                let name = index.name();
                match existing.iter().find(|e| !e.is_id_index() && e.name == name) {
                    None => report
                        .missing_indexes
                        .push((collection.name.clone(), index.clone())),
                    Some(found) if found.spec.as_ref().is_some_and(|s| s.matches(index)) => {}
                    Some(found) => report.mismatched_indexes.push(IndexMismatch {
                        collection: collection.name.clone(),
                        index: name,
                        expected: index.clone(),
                        found: found.spec.clone(),
                    }),
                }
            }
        }

        if !report.is_clean() {
            tracing::warn!(
                target: "chillpanda-db",
                database = %plan.database,
                missing_collections = report.missing_collections.len(),
                missing_indexes = report.missing_indexes.len(),
                mismatched_indexes = report.mismatched_indexes.len(),
                "schema drift detected"
            );
        }
        Ok(report)
    }
}
