use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::notifications::SenderConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid value for {field}: {value}")]
    Invalid { field: &'static str, value: String },
}

/// Where rental contracts live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// JSON file of rental contracts loaded into the memory store at start up.
    pub seed_file: Option<String>,

    pub jwt_secret: Option<String>,
    pub listen_addr: String,
    pub frontend_url: Option<String>,

    /// Operator mailbox that receives expiry reminders.
    pub contact_email: String,
    /// `log`, `sendgrid` or `webhook`. Unset means no transport: sends fail
    /// and reminders stay due.
    pub email_transport: Option<String>,
    pub sendgrid_api_key: Option<String>,
    pub email_from: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_method: String,
    pub webhook_body_template: Option<String>,

    pub dispatch_timeout_secs: u64,
    pub sweep_interval_secs: Option<u64>,
    pub log_dir: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    store_backend: Option<String>,
    database_url: Option<String>,
    database_max_connections: Option<u32>,
    seed_file: Option<String>,
    jwt_secret: Option<String>,
    listen_addr: Option<String>,
    frontend_url: Option<String>,
    contact_email: Option<String>,
    email_transport: Option<String>,
    sendgrid_api_key: Option<String>,
    email_from: Option<String>,
    webhook_url: Option<String>,
    webhook_method: Option<String>,
    webhook_body_template: Option<String>,
    dispatch_timeout_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    log_dir: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_contact_email() -> String {
    "info@hermpo.com".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

fn parse_store_backend(value: &str) -> Result<StoreBackend, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "postgres" => Ok(StoreBackend::Postgres),
        "memory" => Ok(StoreBackend::Memory),
        _ => Err(ConfigError::Invalid {
            field: "STORE_BACKEND",
            value: value.to_string(),
        }),
    }
}

impl ServerConfig {
    /// Loads `.env`, then the optional TOML file, then the process environment.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::load_from(config_path, std::env::vars())
    }

    /// Same as [`ServerConfig::load`] with an explicit environment.
    pub fn load_from<I>(config_path: Option<&str>, env: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        // 1. Load from file (optional)
        let file_config: PartialServerConfig = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str).map_err(|source| ConfigError::Read {
                    path: path_str.to_string(),
                    source,
                })?;
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path_str.to_string(),
                    source,
                })?
            }
            _ => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_iter(env)?;

        // 3. Merge: environment overrides file
        let store_backend = match env_config.store_backend.or(file_config.store_backend) {
            Some(value) => parse_store_backend(&value)?,
            None => StoreBackend::Postgres,
        };
        let database_url = env_config.database_url.or(file_config.database_url);
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let dispatch_timeout_secs = env_config
            .dispatch_timeout_secs
            .or(file_config.dispatch_timeout_secs)
            .unwrap_or(DEFAULT_DISPATCH_TIMEOUT_SECS);
        if dispatch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "DISPATCH_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        let sweep_interval_secs = env_config.sweep_interval_secs.or(file_config.sweep_interval_secs);
        if sweep_interval_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "SWEEP_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        Ok(ServerConfig {
            store_backend,
            database_url,
            database_max_connections: env_config
                .database_max_connections
                .or(file_config.database_max_connections)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            seed_file: env_config.seed_file.or(file_config.seed_file),
            jwt_secret: env_config.jwt_secret.or(file_config.jwt_secret),
            listen_addr: env_config
                .listen_addr
                .or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            frontend_url: env_config.frontend_url.or(file_config.frontend_url),
            contact_email: env_config
                .contact_email
                .or(file_config.contact_email)
                .unwrap_or_else(default_contact_email),
            email_transport: env_config.email_transport.or(file_config.email_transport),
            sendgrid_api_key: env_config.sendgrid_api_key.or(file_config.sendgrid_api_key),
            email_from: env_config.email_from.or(file_config.email_from),
            webhook_url: env_config.webhook_url.or(file_config.webhook_url),
            webhook_method: env_config
                .webhook_method
                .or(file_config.webhook_method)
                .unwrap_or_else(|| "POST".to_string()),
            webhook_body_template: env_config
                .webhook_body_template
                .or(file_config.webhook_body_template),
            dispatch_timeout_secs,
            sweep_interval_secs,
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
        })
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }

    /// Resolves the configured email transport into sender settings.
    pub fn sender_config(&self) -> Result<SenderConfig, ConfigError> {
        let Some(transport) = self.email_transport.as_deref() else {
            return Ok(SenderConfig::Unconfigured);
        };
        match transport.to_ascii_lowercase().as_str() {
            "log" => Ok(SenderConfig::Log),
            "sendgrid" => Ok(SenderConfig::SendGrid {
                api_key: self
                    .sendgrid_api_key
                    .clone()
                    .ok_or(ConfigError::Missing("SENDGRID_API_KEY"))?,
                from: self.email_from.clone().ok_or(ConfigError::Missing("EMAIL_FROM"))?,
            }),
            "webhook" => Ok(SenderConfig::Webhook {
                url: self.webhook_url.clone().ok_or(ConfigError::Missing("WEBHOOK_URL"))?,
                method: self.webhook_method.clone(),
                headers: None,
                body_template: self.webhook_body_template.clone(),
            }),
            other => Err(ConfigError::Invalid {
                field: "EMAIL_TRANSPORT",
                value: other.to_string(),
            }),
        }
    }
}
