use async_trait::async_trait;
use chillpanda_kernel::{CollectionSpec, IndexSpec, InitCtx, Module};

/// One record per chat session, upserted on every message
pub struct UserSessionsModule {
    collection: String,
}

impl UserSessionsModule {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl Module for UserSessionsModule {
    fn name(&self) -> &'static str {
        "user_sessions"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            collection = %self.collection,
            environment = ?ctx.settings.environment,
            "user sessions module initialized"
        );
        Ok(())
    }

    fn collections(&self) -> Vec<CollectionSpec> {
        vec![CollectionSpec::new(self.collection.clone())
            .index(IndexSpec::new().asc("session_id").unique())
            .index(IndexSpec::new().asc("user_id"))
            // most recently active first
            .index(IndexSpec::new().desc("last_activity"))]
    }
}

/// Create the user sessions module for the configured collection
pub fn create_module(collection: &str) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(UserSessionsModule::new(collection))
}
