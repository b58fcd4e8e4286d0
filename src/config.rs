//! Application configuration loaded from environment variables.

use std::env;

const DEFAULT_DATA_SOURCE: &str = "data/Formalizado.zip";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path or HTTP(S) URL to the territory shapefile ZIP
    pub data_source: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            data_source: env::var("TERRITORY_DATA_SOURCE")
                .unwrap_or_else(|_| DEFAULT_DATA_SOURCE.to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT"))?,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.data_source, "data/Formalizado.zip");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("TERRITORY_DATA_SOURCE", "data/test.zip");
        env::set_var("PORT", "9090");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.data_source, "data/test.zip");
        assert_eq!(config.port, 9090);

        env::remove_var("TERRITORY_DATA_SOURCE");
        env::remove_var("PORT");
    }
}
