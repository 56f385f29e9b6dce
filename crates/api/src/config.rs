use std::env;
use std::str::FromStr;
use std::time::Duration;

use showcase_region::{Provider, ResolverConfig};

#[derive(Debug, thiserror::Error)]
#[error("invalid value `{value}` for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// PostgreSQL connection URL. Without one the server runs on the in-memory store.
    pub database_url: Option<String>,
    /// Maximum database connections in the pool.
    pub db_max_connections: u32,
    /// Minimum database connections in the pool.
    pub db_min_connections: u32,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Lifetime of issued admin tokens, in seconds.
    pub jwt_ttl_secs: u64,
    /// Dashboard login name.
    pub admin_username: String,
    /// Argon2 PHC hash of the dashboard password. Login is disabled when unset.
    pub admin_password_hash: Option<String>,
    /// Event bus channel capacity.
    pub event_bus_capacity: usize,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
    /// How long a content document fetched by type is served from memory.
    pub content_cache_ttl_secs: u64,
    /// How long a resolved client region is remembered per IP.
    pub region_cache_ttl_secs: u64,
    /// Per-request timeout for geolocation providers.
    pub geo_timeout_ms: u64,
    /// Linear backoff step between geolocation attempts.
    pub geo_retry_base_ms: u64,
    /// Geolocation attempts before falling back to international.
    pub geo_attempts: u32,
    /// Upper bound on one whole resolution, retries included.
    pub geo_budget_ms: u64,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3030,
            database_url: None,
            db_max_connections: 20,
            db_min_connections: 5,
            jwt_secret: "dev-secret-change-me-in-production".to_string(),
            jwt_ttl_secs: 8 * 60 * 60,
            admin_username: "admin".to_string(),
            admin_password_hash: None,
            event_bus_capacity: 1024,
            log_level: "info".to_string(),
            content_cache_ttl_secs: 300,
            region_cache_ttl_secs: 900,
            geo_timeout_ms: 3000,
            geo_retry_base_ms: 1000,
            geo_attempts: 3,
            geo_budget_ms: 4000,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to [`AppConfig::default`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: text("HOST", d.host),
            port: parse(&lookup, "PORT", d.port)?,
            database_url: optional("DATABASE_URL"),
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", d.db_max_connections)?,
            db_min_connections: parse(&lookup, "DB_MIN_CONNECTIONS", d.db_min_connections)?,
            jwt_secret: text("JWT_SECRET", d.jwt_secret),
            jwt_ttl_secs: parse(&lookup, "JWT_TTL_SECS", d.jwt_ttl_secs)?,
            admin_username: text("ADMIN_USERNAME", d.admin_username),
            admin_password_hash: optional("ADMIN_PASSWORD_HASH"),
            event_bus_capacity: parse(&lookup, "EVENT_BUS_CAPACITY", d.event_bus_capacity)?,
            log_level: text("LOG_LEVEL", d.log_level),
            content_cache_ttl_secs: parse(&lookup, "CONTENT_CACHE_TTL_SECS", d.content_cache_ttl_secs)?,
            region_cache_ttl_secs: parse(&lookup, "REGION_CACHE_TTL_SECS", d.region_cache_ttl_secs)?,
            geo_timeout_ms: parse(&lookup, "GEO_TIMEOUT_MS", d.geo_timeout_ms)?,
            geo_retry_base_ms: parse(&lookup, "GEO_RETRY_BASE_MS", d.geo_retry_base_ms)?,
            geo_attempts: parse(&lookup, "GEO_ATTEMPTS", d.geo_attempts)?,
            geo_budget_ms: parse(&lookup, "GEO_BUDGET_MS", d.geo_budget_ms)?,
            max_body_bytes: parse(&lookup, "MAX_BODY_BYTES", d.max_body_bytes)?,
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn content_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.content_cache_ttl_secs)
    }

    pub fn region_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.region_cache_ttl_secs)
    }

    pub fn jwt_ttl(&self) -> Duration {
        Duration::from_secs(self.jwt_ttl_secs)
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            providers: vec![Provider::ipinfo(), Provider::ipapi()],
            attempts: self.geo_attempts,
            backoff_base: Duration::from_millis(self.geo_retry_base_ms),
            timeout: Duration::from_millis(self.geo_timeout_ms),
            budget: Duration::from_millis(self.geo_budget_ms),
        }
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError {
                key,
                reason: e.to_string(),
                value,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:3030");
        assert!(config.database_url.is_none());
        assert_eq!(config.content_cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.resolver_config().attempts, 3);
        assert_eq!(config.resolver_config().budget, Duration::from_secs(4));
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/showcase"),
            ("GEO_ATTEMPTS", "5"),
            ("GEO_BUDGET_MS", "1500"),
            ("ADMIN_PASSWORD_HASH", ""),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/showcase"));
        assert_eq!(config.geo_attempts, 5);
        assert_eq!(config.resolver_config().budget, Duration::from_millis(1500));
        assert!(config.admin_password_hash.is_none());
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.key, "PORT");
        assert_eq!(err.value, "eighty");
    }
}
