use std::time::Duration;

use crate::authz::NavigationPaths;
use crate::errors::{AppError, AppResult};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";
pub const DEFAULT_SESSION_DATABASE_URL: &str = "sqlite://opsgate-session.db?mode=rwc";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub session_database_url: String,
    pub navigation: NavigationPaths,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session_database_url: DEFAULT_SESSION_DATABASE_URL.to_string(),
            navigation: NavigationPaths::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup; unset or blank keys fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let base_url = get("API_BASE_URL").unwrap_or(defaults.api.base_url);
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::configuration(format!(
                "API_BASE_URL must be an http(s) URL, got {}",
                base_url
            )));
        }

        let timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(AppError::configuration(format!(
                        "HTTP_TIMEOUT_SECS must be a positive integer, got {}",
                        raw
                    )))
                }
            },
            None => defaults.api.timeout,
        };

        let navigation = NavigationPaths {
            login: path_setting(get("LOGIN_PATH"), defaults.navigation.login, "LOGIN_PATH")?,
            default_authenticated: path_setting(
                get("DEFAULT_AUTHENTICATED_PATH"),
                defaults.navigation.default_authenticated,
                "DEFAULT_AUTHENTICATED_PATH",
            )?,
        };

        Ok(Self {
            api: ApiConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                timeout,
            },
            session_database_url: get("SESSION_DATABASE_URL")
                .unwrap_or(defaults.session_database_url),
            navigation,
        })
    }
}

fn path_setting(value: Option<String>, default: String, key: &str) -> AppResult<String> {
    match value {
        Some(path) if path.starts_with('/') => Ok(path),
        Some(path) => Err(AppError::configuration(format!(
            "{} must start with '/', got {}",
            key, path
        ))),
        None => Ok(default),
    }
}
