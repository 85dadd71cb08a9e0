use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use axum::http::HeaderValue;
use thiserror::Error;
use tracing::{info, warn};

const MODE_KEY: &str = "APP_ENV";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub frontend_origin: HeaderValue,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub production: bool,
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(var)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(ServerConfig {
            port: try_load(&lookup, "PORT", "3001")?,
            frontend_origin: try_load(&lookup, "FRONTEND_ORIGIN", "http://localhost:5173")?,
            openai_api_key: read_secret(&lookup, "OPENAI_API_KEY"),
            openai_base_url: try_load(&lookup, "OPENAI_BASE_URL", "https://api.openai.com/v1")?,
            openai_model: try_load(&lookup, "OPENAI_MODEL", "gpt-4o-mini")?,
            production: is_production(&lookup),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub storage_path: PathBuf,
    pub log_path: PathBuf,
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(var)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(ClientConfig {
            api_url: try_load(&lookup, "RECIPE_API_URL", "http://localhost:3001")?,
            storage_path: try_load(&lookup, "KITZ_CHEF_STORAGE", "recipe_storage.json")?,
            log_path: try_load(&lookup, "KITZ_CHEF_LOG", "kitz_chef.log")?,
        })
    }
}

/// Whether the process environment selects production mode.
pub fn production_mode() -> bool {
    is_production(&var)
}

fn is_production<F>(lookup: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(MODE_KEY).is_some_and(|mode| mode.eq_ignore_ascii_case("production"))
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }
    })
}

fn read_secret<F>(lookup: &F, key: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|s| s.trim().to_string()) {
        Some(secret) if !secret.is_empty() => secret,
        _ => {
            warn!("{key} not set, recipe generation will fail");
            String::new()
        }
    }
}
