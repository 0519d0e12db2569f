//! Application configuration module
//!
//! Provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Values are read with the
//! `PAYBRIDGE` prefix and nested sections use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use paybridge::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod gateway;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::{GatewayConfig, GatewayMode};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (billing PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Gateway configuration (Stripe keys, webhook secret, redirect base)
    pub gateway: GatewayConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` if present (for development)
    /// 2. Reads environment variables with the `PAYBRIDGE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `PAYBRIDGE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PAYBRIDGE__GATEWAY__MODE=live` -> `gateway.mode = live`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYBRIDGE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gateway.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize these tests.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("PAYBRIDGE__DATABASE__URL", "postgresql://test@localhost/billing");
        env::set_var("PAYBRIDGE__GATEWAY__TEST_SECRET_KEY", "sk_test_xxx");
        env::set_var("PAYBRIDGE__GATEWAY__WEBHOOK_SECRET", "whsec_xxx");
        env::set_var("PAYBRIDGE__GATEWAY__BASE_URL", "https://billing.example.com");
    }

    fn clear_env() {
        env::remove_var("PAYBRIDGE__DATABASE__URL");
        env::remove_var("PAYBRIDGE__GATEWAY__TEST_SECRET_KEY");
        env::remove_var("PAYBRIDGE__GATEWAY__WEBHOOK_SECRET");
        env::remove_var("PAYBRIDGE__GATEWAY__BASE_URL");
        env::remove_var("PAYBRIDGE__GATEWAY__MODE");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/billing");
        assert_eq!(config.gateway.mode, GatewayMode::Test);
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mode_selection_from_env() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYBRIDGE__GATEWAY__MODE", "live");
        env::set_var("PAYBRIDGE__GATEWAY__LIVE_SECRET_KEY", "sk_live_yyy");
        let result = AppConfig::load();
        env::remove_var("PAYBRIDGE__GATEWAY__LIVE_SECRET_KEY");
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.gateway.mode, GatewayMode::Live);
    }
}
