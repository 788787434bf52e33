use async_trait::async_trait;
use chillpanda_kernel::{CollectionSpec, IndexSpec, InitCtx, Module};

/// Conversation messages, one record per turn
pub struct ChatHistoryModule {
    collection: String,
}

impl ChatHistoryModule {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl Module for ChatHistoryModule {
    fn name(&self) -> &'static str {
        "chat_history"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            collection = %self.collection,
            environment = ?ctx.settings.environment,
            "chat history module initialized"
        );
        Ok(())
    }

    fn collections(&self) -> Vec<CollectionSpec> {
        vec![CollectionSpec::new(self.collection.clone())
            // latest messages per session
            .index(IndexSpec::new().asc("session_id").desc("timestamp"))
            .index(IndexSpec::new().asc("user_id"))]
    }
}

/// Create the chat history module for the configured collection
pub fn create_module(collection: &str) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(ChatHistoryModule::new(collection))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_session_timeline_and_user_lookup() {
        let collections = ChatHistoryModule::new("chat_history").collections();
        assert_eq!(collections.len(), 1);

        let names: Vec<_> = collections[0].indexes.iter().map(IndexSpec::name).collect();
        assert_eq!(names, ["session_id_1_timestamp_-1", "user_id_1"]);
        assert!(collections[0].indexes.iter().all(|index| !index.unique));
    }
}
