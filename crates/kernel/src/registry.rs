use anyhow::{bail, Context};
use std::sync::Arc;

use crate::module::{InitCtx, Module};
use crate::schema::SchemaPlan;

/// Module registry; registration order is provisioning order
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module with the registry
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    /// Get all registered modules
    pub fn modules(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Initialize modules in registration order
    pub async fn init_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Collect every module's collections into one plan for `database`
    pub fn collect_schema(&self, database: &str) -> anyhow::Result<SchemaPlan> {
        let mut plan = SchemaPlan::new(database);

        for module in &self.modules {
            let collections = module.collections();
            for (position, collection) in collections.iter().enumerate() {
                if collections[..position]
                    .iter()
                    .any(|seen| seen.name == collection.name)
                {
                    bail!(
                        "module '{}' declares collection '{}' twice",
                        module.name(),
                        collection.name
                    );
                }
            }

            for collection in collections {
                if let Some(owner) = self.owner_of(&plan, &collection.name) {
                    bail!(
                        "collection '{}' is declared by both '{}' and '{}'",
                        collection.name,
                        owner,
                        module.name()
                    );
                }
                plan.collections.push(collection);
            }
        }

        plan.validate()
            .with_context(|| format!("invalid schema for database '{}'", database))?;

        Ok(plan)
    }

    fn owner_of(&self, plan: &SchemaPlan, collection: &str) -> Option<&'static str> {
        plan.collection(collection)?;
        self.modules
            .iter()
            .find(|module| module.collections().iter().any(|c| c.name == collection))
            .map(|module| module.name())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
