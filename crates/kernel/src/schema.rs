//! Declarative collection and index layout.
//!
//! Modules describe what must exist in the database with these types; the
//! db crate turns them into driver calls.

use std::fmt;

use anyhow::{anyhow, bail};
use serde::Serialize;

/// Characters MongoDB refuses in a database name.
const FORBIDDEN_DATABASE_CHARS: &[char] = &[
    '/', '\\', '.', '"', '$', '*', '<', '>', ':', '|', '?', ' ', '\0',
];

/// Database names are limited to 63 bytes.
const MAX_DATABASE_NAME_LEN: usize = 64;

/// Direction of a single field within an index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Value used in an index key document (`1` / `-1`).
    pub const fn as_i32(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }

    /// Interpret a numeric key value as reported by the server.
    ///
    /// Only the sign matters; zero and non-finite values are not directions.
    pub fn from_number(value: f64) -> Option<Self> {
        if !value.is_finite() || value == 0.0 {
            return None;
        }
        Some(if value > 0.0 {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        })
    }
}

/// Ordered key pattern plus options for one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub keys: Vec<(String, SortOrder)>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            unique: false,
        }
    }

    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortOrder::Ascending));
        self
    }

    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortOrder::Descending));
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// The name the server assigns when none is given, e.g. `session_id_1_timestamp_-1`.
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|(field, order)| format!("{}_{}", field, order.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// True when both key pattern (order-sensitive) and options are equal.
    pub fn matches(&self, other: &IndexSpec) -> bool {
        self == other
    }

    /// True when both specs index the same fields in the same directions.
    pub fn same_keys(&self, other: &IndexSpec) -> bool {
        self.keys == other.keys
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.keys.is_empty() {
            bail!("index must name at least one field");
        }
        for (position, (field, _)) in self.keys.iter().enumerate() {
            if field.is_empty() {
                bail!("index field names must not be empty");
            }
            if self.keys[..position].iter().any(|(seen, _)| seen == field) {
                bail!("index '{}' names field '{}' twice", self.name(), field);
            }
        }
        Ok(())
    }
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for (position, (field, order)) in self.keys.iter().enumerate() {
            if position > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field, order.as_i32())?;
        }
        write!(f, " }}")?;
        if self.unique {
            write!(f, " unique")?;
        }
        Ok(())
    }
}

/// A collection and the indexes declared on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSpec {
    pub name: String,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexes: Vec::new(),
        }
    }

    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_collection_name(&self.name)?;
        for (position, index) in self.indexes.iter().enumerate() {
            index.validate()?;
            if self.indexes[..position]
                .iter()
                .any(|seen| seen.name() == index.name())
            {
                bail!(
                    "collection '{}' declares index '{}' twice",
                    self.name,
                    index.name()
                );
            }
        }
        Ok(())
    }
}

/// Everything that must exist in one logical database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaPlan {
    pub database: String,
    pub collections: Vec<CollectionSpec>,
}

impl SchemaPlan {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: Vec::new(),
        }
    }

    /// Number of declared indexes. The implicit `_id_` index is not counted.
    pub fn index_count(&self) -> usize {
        self.collections.iter().map(|c| c.indexes.len()).sum()
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_database_name(&self.database)?;
        for (position, collection) in self.collections.iter().enumerate() {
            collection.validate()?;
            if self.collections[..position]
                .iter()
                .any(|seen| seen.name == collection.name)
            {
                bail!("collection '{}' is declared twice", collection.name);
            }
        }
        Ok(())
    }
}

pub fn validate_database_name(name: &str) -> anyhow::Result<()> {
    if name.is_empty() {
        return Err(anyhow!("database name must not be empty"));
    }
    if name.len() >= MAX_DATABASE_NAME_LEN {
        return Err(anyhow!(
            "database name '{}' must be shorter than {} bytes",
            name,
            MAX_DATABASE_NAME_LEN
        ));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_DATABASE_CHARS.contains(c)) {
        return Err(anyhow!(
            "database name '{}' contains forbidden character {:?}",
            name,
            c
        ));
    }
    Ok(())
}

pub fn validate_collection_name(name: &str) -> anyhow::Result<()> {
    if name.is_empty() {
        bail!("collection name must not be empty");
    }
    if name.contains('$') || name.contains('\0') {
        bail!("collection name '{}' contains '$' or NUL", name);
    }
    if name.starts_with("system.") {
        bail!("collection name '{}' uses the reserved 'system.' prefix", name);
    }
    Ok(())
}
