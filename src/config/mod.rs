use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Lifetime of a bearer token issued by login
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,

    /// Include the underlying error text in 500 responses
    #[serde(default)]
    pub expose_error_details: bool,

    #[serde(default)]
    pub log_json: bool,

    /// Allowed browser origin; any origin when unset
    #[serde(default)]
    pub cors_origin: Option<String>,

    /// Base URL the terminal front end talks to
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_token: Option<String>,
}

fn default_database_url() -> String {
    "sqlite://project_tracker.db".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_api_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Configuration backed by a private in-memory database, used by tests
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            db_max_connections: 1,
            token_ttl_hours: default_token_ttl_hours(),
            expose_error_details: false,
            log_json: false,
            cors_origin: None,
            api_url: default_api_url(),
            api_token: None,
        }
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_environment_uses_defaults() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.database_url, "sqlite://project_tracker.db");
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.token_ttl_hours, 24);
        assert!(!config.expose_error_details);
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let vars = vec![
            ("DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
            ("EXPOSE_ERROR_DETAILS".to_string(), "true".to_string()),
            ("TOKEN_TTL_HOURS".to_string(), "2".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert!(config.is_in_memory());
        assert!(config.expose_error_details);
        assert_eq!(config.token_ttl_hours, 2);
    }
}
