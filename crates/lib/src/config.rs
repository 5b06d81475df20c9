//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.medigate/config.json`) and environment.
//! The provider credential is resolved once, when the gateway builds its handlers.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Generative model provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Gateway bind, port, CORS and upload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// HTTP port (default 8000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Allowed CORS origins. `"*"` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes; images arrive base64-encoded inside JSON bodies.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Uploads directory. Relative paths are resolved against the config file's parent.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
}

/// Provider endpoint, model and credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// API root, without the `/models/...` suffix.
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// Model name used for every call (text and vision).
    #[serde(default = "default_provider_model")]
    pub model: String,

    /// API key. Overridden by GOOGLE_API_KEY env.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_provider_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_provider_model() -> String {
    "gemini-2.0-flash".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            cors_origins: default_cors_origins(),
            max_body_bytes: default_max_body_bytes(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            model: default_provider_model(),
            api_key: None,
        }
    }
}

/// Resolve the provider API key: env GOOGLE_API_KEY overrides config.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    api_key_from(std::env::var("GOOGLE_API_KEY").ok().as_deref(), config)
}

/// Blank or whitespace-only values count as unset.
fn api_key_from(env_value: Option<&str>, config: &Config) -> Option<String> {
    let non_blank = |s: &str| {
        let t = s.trim();
        (!t.is_empty()).then(|| t.to_string())
    };
    env_value
        .and_then(non_blank)
        .or_else(|| config.provider.api_key.as_deref().and_then(non_blank))
}

/// Load a `.env` file from the working directory if one exists. Variables already set win.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => log::debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("ignoring unreadable .env file: {}", e),
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("MEDIGATE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".medigate").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (or MEDIGATE_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the config directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Resolve the uploads directory: absolute paths are used as-is, relative ones are joined to the config file's parent.
pub fn resolve_uploads_dir(config: &Config, config_path: &Path) -> PathBuf {
    let dir = &config.gateway.uploads_dir;
    if dir.is_absolute() {
        return dir.clone();
    }
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_config_key(key: Option<&str>) -> Config {
        let mut config = Config::default();
        config.provider.api_key = key.map(str::to_string);
        config
    }

    #[test]
    fn env_key_overrides_config_key() {
        let config = with_config_key(Some("from-config"));
        assert_eq!(
            api_key_from(Some(" from-env "), &config).as_deref(),
            Some("from-env")
        );
        assert_eq!(api_key_from(None, &config).as_deref(), Some("from-config"));
    }

    #[test]
    fn blank_env_key_is_ignored() {
        let config = with_config_key(Some("from-config"));
        assert_eq!(api_key_from(Some(""), &config).as_deref(), Some("from-config"));
        assert_eq!(api_key_from(Some("  \t"), &config).as_deref(), Some("from-config"));
    }

    #[test]
    fn no_usable_key_is_none() {
        assert_eq!(api_key_from(Some(" "), &with_config_key(Some("   "))), None);
        assert_eq!(api_key_from(None, &with_config_key(None)), None);
    }

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 8000);
        assert_eq!(g.bind, "127.0.0.1");
        assert_eq!(g.cors_origins, vec!["*".to_string()]);
    }

    #[test]
    fn empty_json_object_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.provider.model, "gemini-2.0-flash");
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.gateway.uploads_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn camel_case_fields_are_read() {
        let config: Config = serde_json::from_str(
            r#"{"gateway":{"maxBodyBytes":1024,"corsOrigins":["http://localhost:3000"]},"provider":{"apiKey":"k","baseUrl":"http://127.0.0.1:9/v1beta"}}"#,
        )
        .unwrap();
        assert_eq!(config.gateway.max_body_bytes, 1024);
        assert_eq!(config.gateway.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.provider.api_key.as_deref(), Some("k"));
        assert_eq!(config.provider.base_url, "http://127.0.0.1:9/v1beta");
    }

    #[test]
    fn resolve_uploads_dir_relative_to_config() {
        let config = Config::default();
        let path = Path::new("/home/user/.medigate/config.json");
        assert_eq!(
            resolve_uploads_dir(&config, path),
            PathBuf::from("/home/user/.medigate/uploads")
        );
    }

    #[test]
    fn resolve_uploads_dir_absolute() {
        let mut config = Config::default();
        config.gateway.uploads_dir = PathBuf::from("/srv/uploads");
        let path = Path::new("/home/user/.medigate/config.json");
        assert_eq!(
            resolve_uploads_dir(&config, path),
            PathBuf::from("/srv/uploads")
        );
    }

    #[test]
    fn load_config_missing_file_uses_defaults() {
        let path = std::env::temp_dir()
            .join(format!("medigate-missing-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.gateway.port, 8000);
    }
}
