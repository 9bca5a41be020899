//! Application configuration.
//!
//! Layers, lowest first: built-in defaults, the optional TOML file,
//! `ROSEANNE__SECTION__KEY` environment variables, and finally the plain
//! deployment variables `ADMIN_USERNAME`, `ADMIN_PASSWORD_HASH`,
//! `JWT_SECRET` and `POSTGRES_URL`.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::auth::AuthConfig;

pub const APP_NAME: &str = "roseanne";

/// Plain environment variables and the keys they override.
const PLAIN_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("ADMIN_USERNAME", "auth.admin_username"),
    ("ADMIN_PASSWORD_HASH", "auth.admin_password_hash"),
    ("JWT_SECRET", "auth.jwt_secret"),
    ("POSTGRES_URL", "database.url"),
];

const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub maintenance: MaintenanceConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Per-request timeout for image HEAD checks.
    pub image_check_timeout_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            image_check_timeout_secs: 5,
        }
    }
}

impl MaintenanceConfig {
    pub fn image_check_timeout(&self) -> Duration {
        Duration::from_secs(self.image_check_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `path` and the process environment.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(path, env::vars().collect())
    }

    /// Load from `path` and the given environment variables.
    pub fn load_with_env(path: &Path, vars: HashMap<String, String>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(&env_prefix())
                    .prefix_separator("__")
                    .separator("__")
                    .source(Some(vars.clone())),
            );

        for (var, key) in PLAIN_ENV_OVERRIDES {
            let value = vars.get(*var).filter(|v| !v.is_empty()).cloned();
            builder = builder.set_override_option(*key, value)?;
        }

        let built = builder
            .build()
            .with_context(|| format!("loading config from {}", path.display()))?;
        built
            .try_deserialize()
            .context("deserializing configuration")
    }

    /// Copy with credentials masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.auth.admin_password_hash.is_some() {
            copy.auth.admin_password_hash = Some(REDACTED.to_string());
        }
        if let Some(secret) = copy.auth.jwt_secret.as_deref()
            && !secret.starts_with("env:")
        {
            copy.auth.jwt_secret = Some(REDACTED.to_string());
        }
        if let Some(url) = copy.database.url.as_deref() {
            copy.database.url = Some(crate::db::redact_url(url));
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing config to TOML")
    }
}

/// Write a commented default config file unless one exists.
pub fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let mut body = format!(
        "# Configuration for {APP_NAME}\n# File: {}\n\n",
        path.display()
    );
    body.push_str(&AppConfig::default().to_toml()?);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

pub fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}

pub fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(default_config_dir()?.join("config.toml"))
}

fn env_prefix() -> String {
    APP_NAME.to_ascii_uppercase()
}
