//! Chill Panda database provisioning.
//!
//! Collects the schema declared by the chat backend's modules and applies it
//! to MongoDB: select the database, ensure collections, ensure indexes,
//! announce.

pub mod modules;

use anyhow::Context;
use chillpanda_db::{MongoStore, ProvisionReport, Provisioner, SchemaStore, VerifyReport};
use chillpanda_kernel::settings::Settings;
use chillpanda_kernel::{InitCtx, ModuleRegistry, SchemaPlan};

/// Re-export commonly used types
pub use chillpanda_db as db;
pub use chillpanda_kernel as kernel;

/// Registry with every schema module registered for `settings`
pub fn build_registry(settings: &Settings) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings);
    registry
}

/// Initialize modules and collect the full layout for the configured database
pub async fn schema_plan(settings: &Settings) -> anyhow::Result<SchemaPlan> {
    let registry = build_registry(settings);
    let ctx = InitCtx { settings };
    registry.init_modules(&ctx).await?;

    registry
        .collect_schema(&settings.database.name)
        .with_context(|| "failed to collect schema")
}

/// Connect to the configured server and fail fast if it is unreachable
pub async fn connect(settings: &Settings) -> anyhow::Result<MongoStore> {
    let store = MongoStore::connect(&settings.database)
        .await
        .with_context(|| "failed to create MongoDB client")?;
    store
        .ping()
        .await
        .with_context(|| "MongoDB did not answer ping")?;

    tracing::info!(database = %settings.database.name, "connected to MongoDB");
    Ok(store)
}

/// Apply the plan through `store` and return the report with the completion line
pub async fn provision_with<S: SchemaStore>(
    store: S,
    settings: &Settings,
) -> anyhow::Result<(ProvisionReport, String)> {
    let plan = schema_plan(settings).await?;
    let mut provisioner = Provisioner::new(store);

    let report = provisioner
        .provision(&plan)
        .await
        .with_context(|| format!("failed to provision database '{}'", plan.database))?;
    let message = provisioner.announce_completion(&settings.display_name);

    Ok((report, message))
}

/// Compare the live database behind `store` with the declared plan
pub async fn verify_with<S: SchemaStore>(
    store: S,
    settings: &Settings,
) -> anyhow::Result<VerifyReport> {
    let plan = schema_plan(settings).await?;
    let mut provisioner = Provisioner::new(store);

    provisioner
        .verify(&plan)
        .await
        .with_context(|| format!("failed to verify database '{}'", plan.database))
}

/// Connect and provision the configured MongoDB server
pub async fn provision(settings: &Settings) -> anyhow::Result<(ProvisionReport, String)> {
    let store = connect(settings).await?;
    provision_with(store, settings).await
}

/// Connect and verify the configured MongoDB server
pub async fn verify(settings: &Settings) -> anyhow::Result<VerifyReport> {
    let store = connect(settings).await?;
    verify_with(store, settings).await
}
