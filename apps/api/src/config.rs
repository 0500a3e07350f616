use anyhow::{Context, Result};

use crate::governor::{parse_overrides, RateOverrides};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub token_ttl_min: u64,
    pub db_uri: String,
    pub db_pool_min: u32,
    pub db_pool_max: u32,
    pub cache_url: String,
    pub free_tier_credits: i64,
    pub cors_origins: Vec<String>,
    pub rate_limit_overrides: RateOverrides,
    pub fetch_max_bytes: usize,
    pub fetch_timeout_ms: u64,
    pub cache_ttl_sec: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            jwt_secret: require_env("JWT_SECRET")?,
            token_ttl_min: env_or("TOKEN_TTL_MIN", 1440)?,
            db_uri: require_env("DB_URI")?,
            db_pool_min: env_or("DB_POOL_MIN", 5)?,
            db_pool_max: env_or("DB_POOL_MAX", 50)?,
            cache_url: std::env::var("CACHE_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            free_tier_credits: env_or("FREE_TIER_CREDITS", 100)?,
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            rate_limit_overrides: parse_overrides(
                &std::env::var("RATE_LIMIT_OVERRIDES").unwrap_or_default(),
            ),
            fetch_max_bytes: env_or("FETCH_MAX_BYTES", 10_485_760)?,
            fetch_timeout_ms: env_or("FETCH_TIMEOUT_MS", 15_000)?,
            cache_ttl_sec: env_or("CACHE_TTL_SEC", 86_400)?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("Environment variable '{key}' is not a valid value")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_parses_and_defaults() {
        std::env::remove_var("ESGLENS_TEST_ABSENT");
        let v: u64 = env_or("ESGLENS_TEST_ABSENT", 42).unwrap();
        assert_eq!(v, 42);

        std::env::set_var("ESGLENS_TEST_PRESENT", "7");
        let v: u64 = env_or("ESGLENS_TEST_PRESENT", 42).unwrap();
        assert_eq!(v, 7);

        std::env::set_var("ESGLENS_TEST_BAD", "seven");
        assert!(env_or::<u64>("ESGLENS_TEST_BAD", 42).is_err());
    }
}
