use clap::{Args, Parser};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

use crate::provider::ProviderProps;

/// Default platform endpoint.
pub const DEFAULT_API_URL: &str = "https://api.cloud-hooks.dev";

/// Default authorization scheme.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Config file picked up from the working directory when none is given.
const CWD_CONFIG_FILE: &str = "cloud-hooks.yaml";

/// Connection flags shared by every command of the binary.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Config file path
    #[arg(short, long, env = "CLOUD_HOOKS_CONFIG", global = true)]
    pub config: Option<String>,

    /// Application identifier
    #[arg(long, env = "CLOUD_HOOKS_APP", global = true)]
    pub app: Option<String>,

    /// Platform endpoint
    #[arg(long, env = "CLOUD_HOOKS_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Application API token
    #[arg(long, env = "CLOUD_HOOKS_AUTH_TOKEN", global = true, hide_env_values = true)]
    pub auth_token: Option<String>,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct ConfigCli {
    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub connection: ConnectionConfig,
    pub upload: UploadSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    pub app: String,
    pub api_url: String,
    pub token_type: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    pub environment: String,
}

/// Tuning for the bundled HTTP upload transport.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    /// Size of each streamed body piece, one progress event per piece.
    pub chunk_size: usize,
    /// Files above this size are refused at registration.
    pub max_file_size: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            chunk_size: 256 * 1024,
            max_file_size: 5 * 1024 * 1024 * 1024,
        }
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = ConfigCli::try_parse_from(args)
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::load_with(&cli.connection)
    }

    /// Layer defaults, config file, `CLOUD_HOOKS__*` env vars and flags.
    ///
    /// Priority: CLI flag > CLI env var > `CLOUD_HOOKS__` env var > config file > defaults.
    pub fn load_with(args: &ConnectionArgs) -> Result<Self, config::ConfigError> {
        let defaults = UploadSettings::default();
        let mut builder = Config::builder()
            .set_default("connection.app", "")?
            .set_default("connection.api_url", DEFAULT_API_URL)?
            .set_default("connection.token_type", DEFAULT_TOKEN_TYPE)?
            .set_default("connection.environment", "production")?
            .set_default("upload.chunk_size", defaults.chunk_size as u64)?
            .set_default("upload.max_file_size", defaults.max_file_size)?;

        match &args.config {
            Some(path) => {
                builder = builder.add_source(File::new(path, FileFormat::Yaml));
            }
            None if Path::new(CWD_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::new(CWD_CONFIG_FILE, FileFormat::Yaml));
            }
            None => {}
        }

        // E.g. CLOUD_HOOKS__CONNECTION__APP=my-app
        builder = builder.add_source(
            Environment::with_prefix("CLOUD_HOOKS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(app) = &args.app {
            builder = builder.set_override("connection.app", app.as_str())?;
        }
        if let Some(api_url) = &args.api_url {
            builder = builder.set_override("connection.api_url", api_url.as_str())?;
        }
        if let Some(token) = &args.auth_token {
            builder = builder.set_override("connection.auth_token", token.as_str())?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        if cfg.connection.app.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "connection.app is required (--app, CLOUD_HOOKS_APP or config file)".to_string(),
            ));
        }
        Ok(cfg)
    }

    pub fn provider_props(&self) -> ProviderProps {
        ProviderProps {
            app: self.connection.app.clone(),
            api_url: Some(self.connection.api_url.clone()),
            token_type: Some(self.connection.token_type.clone()),
            auth_token: self.connection.auth_token.clone(),
            environment: Some(self.connection.environment.clone()),
        }
    }
}
