use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub throttle: ThrottleConfig,
    pub errors: ErrorsConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; the in-memory store is used when unset
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix mounted in front of every API route, without slashes
    pub api_prefix: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleTierConfig {
    pub name: String,
    pub limit: u32,
    pub ttl_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Tiers applied to every throttled route
    pub global: Vec<ThrottleTierConfig>,
    /// Stricter tier for single-student lookups
    pub student_lookup: ThrottleTierConfig,
}

#[derive(Debug, Clone)]
pub struct ErrorsConfig {
    /// Include the legacy `response` copy of `message` in error bodies
    pub compat_response: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                acquire_timeout_ms: 30_000,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                api_prefix: "api".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
            },
            throttle: ThrottleConfig::default(),
            errors: ErrorsConfig {
                compat_response: true,
            },
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global: vec![
                ThrottleTierConfig {
                    name: "short".to_string(),
                    limit: 3,
                    ttl_ms: 60_000,
                },
                ThrottleTierConfig {
                    name: "long".to_string(),
                    limit: 100,
                    ttl_ms: 60_000,
                },
            ],
            student_lookup: ThrottleTierConfig {
                name: "default".to_string(),
                limit: 1,
                ttl_ms: 1_000,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Environment-specific file wins over the shared one
        dotenvy::from_filename(".env.development").ok();
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let throttle_defaults = &defaults.throttle;

        Ok(Config {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
                max_connections: parse_var(
                    "DATABASE_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                )?,
                acquire_timeout_ms: parse_var(
                    "DATABASE_ACQUIRE_TIMEOUT_MS",
                    defaults.database.acquire_timeout_ms,
                )?,
            },
            server: ServerConfig {
                host: env::var("API_HOST").unwrap_or(defaults.server.host),
                port: parse_var("PORT", defaults.server.port)?,
                api_prefix: env::var("API_PREFIX")
                    .map(|prefix| prefix.trim_matches('/').to_string())
                    .unwrap_or(defaults.server.api_prefix),
            },
            logging: LoggingConfig {
                log_dir: env::var("LOG_DIR").unwrap_or(defaults.logging.log_dir),
            },
            throttle: ThrottleConfig {
                global: vec![
                    tier_from_env("short", "THROTTLE_SHORT", &throttle_defaults.global[0])?,
                    tier_from_env("long", "THROTTLE_LONG", &throttle_defaults.global[1])?,
                ],
                student_lookup: throttle_defaults.student_lookup.clone(),
            },
            errors: ErrorsConfig {
                compat_response: parse_var(
                    "ERROR_RESPONSE_COMPAT",
                    defaults.errors.compat_response,
                )?,
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn tier_from_env(
    name: &str,
    var_prefix: &str,
    default: &ThrottleTierConfig,
) -> Result<ThrottleTierConfig> {
    Ok(ThrottleTierConfig {
        name: name.to_string(),
        limit: parse_var(&format!("{}_LIMIT", var_prefix), default.limit)?,
        ttl_ms: parse_var(&format!("{}_TTL_MS", var_prefix), default.ttl_ms)?,
    })
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_address() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 3000;

        assert_eq!(config.server_address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_default_throttle_tiers() {
        let throttle = ThrottleConfig::default();

        assert_eq!(throttle.global.len(), 2);
        assert_eq!(throttle.global[0].name, "short");
        assert_eq!(throttle.global[0].limit, 3);
        assert_eq!(throttle.global[1].limit, 100);
        assert_eq!(throttle.student_lookup.limit, 1);
        assert_eq!(throttle.student_lookup.ttl_ms, 1_000);
    }

    #[test]
    fn test_parse_var_reports_bad_numbers() {
        env::set_var("STUDENT_REGISTRY_TEST_BAD_PORT", "eighty");
        let result: Result<u16> = parse_var("STUDENT_REGISTRY_TEST_BAD_PORT", 3000);
        env::remove_var("STUDENT_REGISTRY_TEST_BAD_PORT");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("STUDENT_REGISTRY_TEST_BAD_PORT"));
    }

    #[test]
    fn test_parse_var_default_when_unset() {
        let value: u32 = parse_var("STUDENT_REGISTRY_TEST_UNSET", 42).unwrap();
        assert_eq!(value, 42);
    }
}
