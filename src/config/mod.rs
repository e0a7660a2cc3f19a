use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub session_duration_hours: i64,
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    pub sendgrid_api_key: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sendgrid_api_key: None,
            api_base_url: default_api_base_url(),
            from_address: default_from_address(),
            from_name: default_from_name(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_from_address() -> String {
    "noreply@example.org".to_string()
}

fn default_from_name() -> String {
    "C-CAP Apprentice Program".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("database.url", "sqlite://apprentice-portal.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.session_duration_hours", 24)?
            .set_default("email.enabled", false)?
            .set_default("email.batch_size", DEFAULT_BATCH_SIZE as i64)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with PORTAL__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("PORTAL").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://apprentice-portal.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                session_duration_hours: 24,
                secure_cookies: false,
            },
            email: EmailConfig::default(),
        }
    }
}
