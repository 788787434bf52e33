//! Core traits, settings, and schema declarations shared by the Chill Panda
//! provisioning crates.

pub mod module;
pub mod registry;
pub mod schema;
pub mod settings;

pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
pub use schema::{CollectionSpec, IndexSpec, SchemaPlan, SortOrder};
