use anyhow::Context;
use chillpanda_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load Chill Panda settings")?;
    chillpanda_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        database = %settings.database.name,
        "chillpanda-init starting"
    );

    let (report, message) = chillpanda_app::provision(&settings).await?;

    tracing::info!(created = report.created_count(), "chillpanda-init complete");
    println!("{}", message);
    Ok(())
}
