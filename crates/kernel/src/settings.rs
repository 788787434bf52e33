use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;

use crate::schema::{validate_collection_name, validate_database_name};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "CHILLPANDA_ENV";
const CONFIG_DIR_ENV: &str = "CHILLPANDA_CONFIG_DIR";
const ENV_PREFIX: &str = "CHILLPANDA";
const ENV_SEPARATOR: &str = "__";

/// Variables the chat backend already reads; they win over every other source.
const LEGACY_OVERRIDES: &[(&str, &str)] = &[
    ("MONGODB_URI", "database.uri"),
    ("MONGODB_DATABASE", "database.name"),
    ("MONGODB_CHATS_COLLECTION", "collections.chat_history"),
    ("MONGODB_SESSIONS_COLLECTION", "collections.user_sessions"),
];

/// Deployment environment the provisioner is running against.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "Settings::default_display_name")]
    pub display_name: String,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub collections: CollectionSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay,
    /// prefixed variables and finally the legacy `MONGODB_*` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load from an explicit config directory and environment name.
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment = Environment::parse(environment)?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let mut builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );

        for (variable, key) in LEGACY_OVERRIDES {
            builder = builder
                .set_override_option(*key, std::env::var(variable).ok())
                .with_context(|| format!("failed to apply {}", variable))?;
        }

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_environment;
        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_database_name(&self.database.name)?;
        validate_collection_name(&self.collections.chat_history)?;
        validate_collection_name(&self.collections.user_sessions)?;
        if self.collections.chat_history == self.collections.user_sessions {
            bail!(
                "chat history and user sessions must use different collections, both are '{}'",
                self.collections.chat_history
            );
        }
        if self.database.server_selection_timeout_ms == 0 {
            bail!("database.server_selection_timeout_ms must be positive");
        }
        Ok(())
    }

    fn default_display_name() -> String {
        "Chill Panda".to_string()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            display_name: Self::default_display_name(),
            database: DatabaseSettings::default(),
            collections: CollectionSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_uri")]
    pub uri: String,
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
    #[serde(default = "DatabaseSettings::default_server_selection_timeout_ms")]
    pub server_selection_timeout_ms: u64,
    #[serde(default = "DatabaseSettings::default_app_name")]
    pub app_name: String,
}

impl DatabaseSettings {
    fn default_uri() -> String {
        "mongodb://localhost:27017".to_string()
    }

    fn default_name() -> String {
        "chillpanda_db".to_string()
    }

    fn default_server_selection_timeout_ms() -> u64 {
        5000
    }

    fn default_app_name() -> String {
        "chillpanda-init".to_string()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            name: Self::default_name(),
            server_selection_timeout_ms: Self::default_server_selection_timeout_ms(),
            app_name: Self::default_app_name(),
        }
    }
}

/// Collection names used by the chat backend.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    #[serde(default = "CollectionSettings::default_chat_history")]
    pub chat_history: String,
    #[serde(default = "CollectionSettings::default_user_sessions")]
    pub user_sessions: String,
}

impl CollectionSettings {
    fn default_chat_history() -> String {
        "chat_history".to_string()
    }

    fn default_user_sessions() -> String {
        "user_sessions".to_string()
    }
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            chat_history: Self::default_chat_history(),
            user_sessions: Self::default_user_sessions(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_log_level")]
    pub log_level: String,
}

impl TelemetrySettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_level: Self::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
