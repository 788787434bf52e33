//! MongoDB client factory and idempotent schema provisioning.
//!
//! [`Provisioner`] drives any [`SchemaStore`]: [`MongoStore`] talks to a real
//! server, [`MemoryStore`] mimics one in process.

pub mod error;
pub mod memory;
pub mod mongo;
pub mod provisioner;
pub mod store;

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use provisioner::{
    CollectionOutcome, Ensured, IndexMismatch, IndexOutcome, ProvisionReport, Provisioner,
    VerifyReport,
};
pub use store::{ExistingIndex, SchemaStore, ID_INDEX_NAME};
