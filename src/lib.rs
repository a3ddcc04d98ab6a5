//! CarePortal clinic service core library
//!
//! This module exports the appointment, encounter, prescription and lab
//! workflows together with the role model and the REST API that serves them.

pub mod api;
pub mod audit;
pub mod auth;
pub mod clinic;
pub mod core;
pub mod db;
pub mod error;
pub mod models;

pub use clinic::ClinicService;
pub use error::{PortalError, PortalResult};

/// Application configuration
pub mod config {
    use serde::Deserialize;

    #[derive(Debug, Clone, Deserialize)]
    pub struct Config {
        pub server: ServerConfig,
        pub auth: AuthConfig,
        pub logging: LoggingConfig,
        pub portal: PortalConfig,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
        pub workers: Option<usize>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct AuthConfig {
        pub jwt_secret: String,
        pub token_ttl_minutes: i64,
        /// Argon2 memory cost in KiB
        pub argon2_memory_kib: u32,
        pub argon2_iterations: u32,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct LoggingConfig {
        pub level: String,
        pub json: bool,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct PortalConfig {
        /// Fixed delay applied before every save
        pub simulated_latency_ms: u64,
        pub seed_demo_data: bool,
        pub email_sender: String,
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                server: ServerConfig {
                    host: "127.0.0.1".into(),
                    port: 8080,
                    workers: None,
                },
                auth: AuthConfig {
                    jwt_secret: "change-me".into(),
                    token_ttl_minutes: 60,
                    argon2_memory_kib: 19 * 1024,
                    argon2_iterations: 2,
                },
                logging: LoggingConfig {
                    level: "info".into(),
                    json: false,
                },
                portal: PortalConfig {
                    simulated_latency_ms: 0,
                    seed_demo_data: true,
                    email_sender: "no-reply@careportal.local".into(),
                },
            }
        }
    }

    /// Load configuration from file
    pub fn load_config() -> Result<Config, config::ConfigError> {
        let defaults = Config::default();
        let env = std::env::var("PORTAL_ENV").unwrap_or_else(|_| "development".into());

        let settings = config::Config::builder()
            // Start with default settings
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("auth.jwt_secret", defaults.auth.jwt_secret)?
            .set_default("auth.token_ttl_minutes", defaults.auth.token_ttl_minutes)?
            .set_default("auth.argon2_memory_kib", i64::from(defaults.auth.argon2_memory_kib))?
            .set_default("auth.argon2_iterations", i64::from(defaults.auth.argon2_iterations))?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.json", defaults.logging.json)?
            .set_default("portal.simulated_latency_ms", defaults.portal.simulated_latency_ms as i64)?
            .set_default("portal.seed_demo_data", defaults.portal.seed_demo_data)?
            .set_default("portal.email_sender", defaults.portal.email_sender)?
            .add_source(config::File::with_name("config/default").required(false))
            // Override with environment-specific settings
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("PORTAL").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
