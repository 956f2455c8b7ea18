use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Raw contents of the JSON config file.
pub type ConfigMap = Map<String, Value>;

pub const WEBHOOK_URL_KEY: &str = "webhook_url";
pub const DEFAULT_USERNAME_KEY: &str = "default_username";
pub const DEFAULT_AVATAR_URL_KEY: &str = "default_avatar_url";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {} is not valid JSON", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config file {} must contain a JSON object", path.display())]
    NotAnObject { path: PathBuf },

    #[error("no webhook URL given: pass --webhook-url or set \"webhook_url\" in the config file")]
    MissingWebhookUrl,
}

/// Values supplied on the command line. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub webhook_url: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

/// Settings after merging, before the webhook URL requirement is enforced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    pub webhook_url: Option<String>,
    pub default_username: Option<String>,
    pub default_avatar_url: Option<String>,
}

/// Settings a send can run with. `webhook_url` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub webhook_url: String,
    pub default_username: Option<String>,
    pub default_avatar_url: Option<String>,
}

impl TryFrom<ResolvedConfig> for EffectiveConfig {
    type Error = ConfigError;

    fn try_from(resolved: ResolvedConfig) -> Result<Self, Self::Error> {
        let webhook_url = resolved.webhook_url.ok_or(ConfigError::MissingWebhookUrl)?;

        Ok(Self {
            webhook_url,
            default_username: resolved.default_username,
            default_avatar_url: resolved.default_avatar_url,
        })
    }
}

pub fn load_config(path: &Path) -> Result<ConfigMap, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ConfigError::NotFound { path: path.to_path_buf() },
        _ => ConfigError::Read { path: path.to_path_buf(), source },
    })?;

    let value: Value = serde_json::from_str(&content)
        .map_err(|source| ConfigError::InvalidJson { path: path.to_path_buf(), source })?;

    let Value::Object(map) = value else {
        return Err(ConfigError::NotAnObject { path: path.to_path_buf() });
    };

    debug!("Loaded {} key(s) from {}", map.len(), path.display());
    Ok(map)
}

/// Merges CLI overrides over the config file, field by field.
pub fn resolve(overrides: &Overrides, config: &ConfigMap) -> ResolvedConfig {
    ResolvedConfig {
        webhook_url: pick(overrides.webhook_url.as_deref(), config, WEBHOOK_URL_KEY),
        default_username: pick(overrides.username.as_deref(), config, DEFAULT_USERNAME_KEY),
        default_avatar_url: pick(overrides.avatar_url.as_deref(), config, DEFAULT_AVATAR_URL_KEY),
    }
}

fn pick(cli: Option<&str>, config: &ConfigMap, key: &str) -> Option<String> {
    if let Some(value) = cli.filter(|v| !v.is_empty()) {
        return Some(value.to_string());
    }

    match config.get(key) {
        Some(Value::String(value)) if !value.is_empty() => Some(value.clone()),
        Some(Value::String(_)) | Some(Value::Null) | None => None,
        Some(other) => {
            warn!("Ignoring config key \"{}\": expected a string, got {}", key, other);
            None
        }
    }
}
