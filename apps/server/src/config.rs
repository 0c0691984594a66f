//! Server configuration
//!
//! Loaded from optional `config/default.toml` / `config/local.toml` files,
//! then overridden by `ROENTGEN__*` environment variables (double underscore
//! as the section separator, e.g. `ROENTGEN__SERVER__PORT=8080`). A plain
//! `DATABASE_URL` variable is honoured as the conventional override for the
//! database connection string.

use std::net::SocketAddr;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// PostgreSQL via sqlx; the production backend.
    Postgres,
    /// Process-local storage for development and tests.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: String,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// When disabled the service trusts its network and treats every caller
    /// as an administrator. Development and test use only.
    pub enabled: bool,
    /// Keycloak realm URL, e.g. `https://idp.example/realms/roentgen`.
    pub issuer_url: Option<String>,
    pub audience: Option<String>,
    /// Explicit JWKS endpoint; discovered from the issuer when unset.
    pub jwks_url: Option<String>,
    /// Role that gates the admin endpoints.
    pub admin_role: String,
    pub http_timeout_seconds: u64,
    pub jwks_cache_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080_i64)?
            .set_default("server.cors_origins", Vec::<String>::new())?
            .set_default("database.backend", "postgres")?
            .set_default("database.url", "")?
            .set_default("database.pool_max_size", 10_i64)?
            .set_default("database.pool_timeout_seconds", 30_i64)?
            .set_default("auth.enabled", false)?
            .set_default("auth.admin_role", "admin")?
            .set_default("auth.http_timeout_seconds", 10_i64)?
            .set_default("auth.jwks_cache_ttl_seconds", 300_i64)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("ROENTGEN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            );

        let mut loaded: Config = builder.build()?.try_deserialize()?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            loaded.database.url = url;
        }

        Ok(loaded)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.database.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err("database.url must be set for the postgres backend".to_string());
        }
        if self.auth.enabled {
            if self.auth.issuer_url.is_none() {
                return Err("auth.issuer_url must be set when auth is enabled".to_string());
            }
            if self.auth.audience.is_none() {
                return Err("auth.audience must be set when auth is enabled".to_string());
            }
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec![],
            },
            database: DatabaseConfig {
                backend: StorageBackend::Memory,
                url: String::new(),
                pool_max_size: 5,
                pool_timeout_seconds: 30,
            },
            auth: AuthConfig {
                enabled: false,
                issuer_url: None,
                audience: None,
                jwks_url: None,
                admin_role: "admin".to_string(),
                http_timeout_seconds: 10,
                jwks_cache_ttl_seconds: 300,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }

    #[test]
    fn memory_backend_needs_no_url() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn postgres_backend_requires_url() {
        let mut config = base_config();
        config.database.backend = StorageBackend::Postgres;
        assert!(config.validate().is_err());
    }

    #[test]
    fn enabled_auth_requires_issuer_and_audience() {
        let mut config = base_config();
        config.auth.enabled = true;
        assert!(config.validate().is_err());

        config.auth.issuer_url = Some("https://idp.example/realms/roentgen".to_string());
        assert!(config.validate().is_err());

        config.auth.audience = Some("roentgen-api".to_string());
        assert!(config.validate().is_ok());
    }
}
