use async_trait::async_trait;

use crate::schema::CollectionSpec;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// A unit of the chat backend that owns part of the database layout
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Called once before the schema is collected
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Collections this module owns, with their indexes in declaration order
    fn collections(&self) -> Vec<CollectionSpec> {
        vec![]
    }
}
