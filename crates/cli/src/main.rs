use anyhow::{bail, Context};
use chillpanda_app::db::{ProvisionReport, VerifyReport};
use chillpanda_kernel::{settings::Settings, SchemaPlan};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "chillpanda-cli", version, about = "Provision the Chill Panda MongoDB schema")]
struct Cli {
    /// MongoDB connection string
    #[arg(long, global = true, env = "MONGODB_URI")]
    uri: Option<String>,

    /// Logical database to provision
    #[arg(long, global = true, env = "MONGODB_DATABASE")]
    database: Option<String>,

    /// Emit machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create missing collections and indexes (default)
    Provision,
    /// Report drift between the database and the declared schema
    Verify,
    /// Print the declared schema without connecting
    Plan,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load Chill Panda settings")?;
    if let Some(uri) = cli.uri {
        settings.database.uri = uri;
    }
    if let Some(database) = cli.database {
        settings.database.name = database;
    }
    settings.validate()?;

    chillpanda_telemetry::init(&settings.telemetry)?;
    tracing::info!(env = ?settings.environment, "chillpanda-cli starting");

    match cli.command.unwrap_or(Command::Provision) {
        Command::Provision => {
            let (report, message) = chillpanda_app::provision(&settings).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_provision(&report);
                println!("{}", message);
            }
        }
        Command::Verify => {
            let report = chillpanda_app::verify(&settings).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_verify(&report);
            }
            if !report.is_clean() {
                bail!("database '{}' does not match the declared schema", report.database);
            }
        }
        Command::Plan => {
            let plan = chillpanda_app::schema_plan(&settings).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_plan(&plan);
            }
        }
    }

    Ok(())
}

fn print_plan(plan: &SchemaPlan) {
    println!("database {}", plan.database);
    for collection in &plan.collections {
        println!("  collection {}", collection.name);
        for index in &collection.indexes {
            println!("    index {} {}", index.name(), index);
        }
    }
}

fn print_provision(report: &ProvisionReport) {
    for collection in &report.collections {
        println!("collection {}: {}", collection.collection, collection.outcome);
    }
    for index in &report.indexes {
        println!("index {}.{}: {}", index.collection, index.index, index.outcome);
    }
}

fn print_verify(report: &VerifyReport) {
    if report.is_clean() {
        println!("database {} matches the declared schema", report.database);
        return;
    }
    for collection in &report.missing_collections {
        println!("missing collection {}", collection);
    }
    for (collection, index) in &report.missing_indexes {
        println!("missing index {}.{} {}", collection, index.name(), index);
    }
    for mismatch in &report.mismatched_indexes {
        let found = mismatch
            .found
            .as_ref()
            .map_or_else(|| "unsupported key pattern".to_string(), ToString::to_string);
        println!(
            "mismatched index {}.{}: expected {}, found {}",
            mismatch.collection, mismatch.index, mismatch.expected, found
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["chillpanda-cli"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["chillpanda-cli", "plan", "--json", "--database", "panda_qa"])
            .unwrap();
        assert!(matches!(cli.command, Some(Command::Plan)));
        assert!(cli.json);
        assert_eq!(cli.database.as_deref(), Some("panda_qa"));
    }
}
