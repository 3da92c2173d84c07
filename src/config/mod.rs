use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    /// `["*"]` allows any origin.
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Build configuration from the process environment. Call `dotenvy::dotenv()` first
    /// if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()?;

        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = parse_var("PORT", v)?;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
                self.database.backend = StoreBackend::Postgres;
            }
        }
        if let Ok(v) = env::var("PROPERTY_STORE") {
            self.database.backend = match v.to_ascii_lowercase().as_str() {
                "postgres" | "pg" => StoreBackend::Postgres,
                "memory" | "mem" => StoreBackend::Memory,
                _ => return Err(ConfigError::Invalid { name: "PROPERTY_STORE", value: v }),
            };
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("DATABASE_MAX_CONNECTIONS", v)?;
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = parse_var("DATABASE_CONNECTION_TIMEOUT", v)?;
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = parse_var("JWT_EXPIRY_HOURS", v)?;
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cors_origins: vec!["*".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }

    /// In-memory configuration with the given secret, used by tests and local tooling.
    pub fn for_testing(secret: impl Into<String>) -> Self {
        let mut config = Self::development();
        config.server.host = "127.0.0.1".to_string();
        config.security.jwt_secret = secret.into();
        config
    }
}

/// Every numeric override must parse; a typo is an error, never a silent default.
fn parse_var<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.security.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.security.jwt_expiry_hours, 168);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.security.jwt_expiry_hours, 4);
    }

    #[test]
    fn empty_secret_is_rejected() {
        let config = AppConfig::development();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("JWT_SECRET"))));
    }

    #[test]
    fn postgres_backend_requires_url() {
        let mut config = AppConfig::for_testing("secret");
        config.database.backend = StoreBackend::Postgres;
        assert!(matches!(config.validate(), Err(ConfigError::Missing("DATABASE_URL"))));

        config.database.url = Some("postgres://localhost/properties".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn secret_is_not_serialized() {
        let config = AppConfig::for_testing("top-secret");
        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("top-secret"));
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn numeric_overrides_must_parse() {
        assert_eq!(parse_var::<u32>("DATABASE_MAX_CONNECTIONS", " 25 ".to_string()).unwrap(), 25);
        assert_eq!(parse_var::<u64>("JWT_EXPIRY_HOURS", "12".to_string()).unwrap(), 12);

        for (name, value) in [
            ("PORT", "http"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
            ("DATABASE_CONNECTION_TIMEOUT", "-5"),
            ("JWT_EXPIRY_HOURS", "1.5"),
        ] {
            match parse_var::<u64>(name, value.to_string()) {
                Err(ConfigError::Invalid { name: reported, value: raw }) => {
                    assert_eq!(reported, name);
                    assert_eq!(raw, value);
                }
                other => panic!("{} accepted {:?}: {:?}", name, value, other),
            }
        }
    }
}
