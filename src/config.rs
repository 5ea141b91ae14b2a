/*
 * Responsibility
 * - Load settings from the environment (and `.env` when present)
 * - Validate values; anything unparsable fails startup
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::services::authz::TokenPolicy;

pub const DEFAULT_KEYCLOAK_URL: &str = "http://keycloak:8080";
pub const DEFAULT_KEYCLOAK_REALM: &str = "observability";
pub const DEFAULT_TENANT: &str = "tenant-pe";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub keycloak_url: Url,
    pub keycloak_realm: String,
    pub default_tenant: String,

    pub key_fetch_timeout: Duration,
    // None: keys are kept for the process lifetime.
    pub key_cache_ttl: Option<Duration>,

    pub verify_audience: bool,
    pub token_audience: String,
    pub token_leeway_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test fixtures).
    pub fn from_source<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset.
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let port: u16 = parse_or(get("PORT"), "PORT", 8000)?;
        let addr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV"));

        let keycloak_url = get("KEYCLOAK_URL").unwrap_or_else(|| DEFAULT_KEYCLOAK_URL.to_string());
        let keycloak_url = Url::parse(&keycloak_url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or(ConfigError::Invalid("KEYCLOAK_URL"))?;

        let keycloak_realm =
            get("KEYCLOAK_REALM").unwrap_or_else(|| DEFAULT_KEYCLOAK_REALM.to_string());
        if keycloak_realm.contains('/') {
            return Err(ConfigError::Invalid("KEYCLOAK_REALM"));
        }

        let default_tenant = get("DEFAULT_TENANT").unwrap_or_else(|| DEFAULT_TENANT.to_string());

        let key_fetch_timeout_seconds: u64 =
            parse_or(get("KEY_FETCH_TIMEOUT_SECONDS"), "KEY_FETCH_TIMEOUT_SECONDS", 5)?;
        if key_fetch_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("KEY_FETCH_TIMEOUT_SECONDS"));
        }

        let key_cache_ttl = get("KEY_CACHE_TTL_SECONDS")
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|s| *s > 0)
                    .map(Duration::from_secs)
                    .ok_or(ConfigError::Invalid("KEY_CACHE_TTL_SECONDS"))
            })
            .transpose()?;

        let verify_audience = match get("VERIFY_AUDIENCE") {
            None => false,
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("VERIFY_AUDIENCE"))?,
        };
        let token_audience = get("TOKEN_AUDIENCE").unwrap_or_else(|| "account".to_string());

        let token_leeway_seconds: u64 =
            parse_or(get("TOKEN_LEEWAY_SECONDS"), "TOKEN_LEEWAY_SECONDS", 0)?;

        Ok(Self {
            addr,
            app_env,
            keycloak_url,
            keycloak_realm,
            default_tenant,
            key_fetch_timeout: Duration::from_secs(key_fetch_timeout_seconds),
            key_cache_ttl,
            verify_audience,
            token_audience,
            token_leeway_seconds,
        })
    }

    pub fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            verify_audience: self.verify_audience,
            audience: self.token_audience.clone(),
            leeway_seconds: self.token_leeway_seconds,
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
