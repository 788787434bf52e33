//! Error types for schema provisioning

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

/// Failures surfaced by a [`crate::SchemaStore`] or the provisioner.
///
/// Driver errors are carried unchanged as the source so callers see exactly
/// what the server reported.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("{operation} failed")]
    Mongo {
        operation: String,
        #[source]
        source: mongodb::error::Error,
    },

    #[error("no database selected")]
    NoDatabaseSelected,

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid index: {0}")]
    InvalidIndex(String),

    #[error("collection '{0}' already exists")]
    NamespaceExists(String),

    #[error("index '{name}' on '{collection}' conflicts with existing index {existing}")]
    IndexConflict {
        collection: String,
        name: String,
        existing: String,
    },

    #[error("duplicate key in '{collection}' for unique index '{index}'")]
    DuplicateKey { collection: String, index: String },
}

impl DbError {
    pub(crate) fn mongo(operation: impl Into<String>, source: mongodb::error::Error) -> Self {
        Self::Mongo {
            operation: operation.into(),
            source,
        }
    }

    pub(crate) fn invalid_name(err: anyhow::Error) -> Self {
        Self::InvalidName(format!("{:#}", err))
    }

    pub(crate) fn invalid_index(err: anyhow::Error) -> Self {
        Self::InvalidIndex(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_name_keeps_full_message() {
        let err = DbError::invalid_name(anyhow::anyhow!("collection name must not be empty"));
        assert_eq!(
            err.to_string(),
            "invalid name: collection name must not be empty"
        );
    }

    #[test]
    fn invalid_index_is_not_reported_as_a_name() {
        let err = DbError::invalid_index(anyhow::anyhow!("index must name at least one field"));
        assert_eq!(err.to_string(), "invalid index: index must name at least one field");
    }

    #[test]
    fn conflict_names_both_sides() {
        let err = DbError::IndexConflict {
            collection: "user_sessions".to_string(),
            name: "session_id_1".to_string(),
            existing: "{ session_id: 1 }".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("session_id_1"));
        assert!(message.contains("user_sessions"));
    }
}
