//! Configuration management for eventdeck.
//!
//! Loads configuration from ${EVENTDECK_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding `api_base_url`.
pub const API_URL_ENV: &str = "EVENTDECK_API_URL";
/// Environment variable overriding the Google OAuth client id.
pub const GOOGLE_CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
/// Environment variable overriding the Google OAuth client secret.
pub const GOOGLE_CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";

const PLACEHOLDER_CLIENT_ID: &str = "dummy-client-id";
const PLACEHOLDER_CLIENT_SECRET: &str = "dummy-client-secret";

/// Returns the default config template with comments.
///
/// Embedded from `default_config.toml` at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for eventdeck configuration and session data.
    //!
    //! EVENTDECK_HOME resolution order:
    //! 1. EVENTDECK_HOME environment variable (if set)
    //! 2. ~/.config/eventdeck (default)

    use std::path::PathBuf;

    /// Returns the eventdeck home directory.
    pub fn eventdeck_home() -> PathBuf {
        if let Ok(home) = std::env::var("EVENTDECK_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".eventdeck"),
            |h| h.join(".config").join("eventdeck"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        eventdeck_home().join("config.toml")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        eventdeck_home().join("session.json")
    }
}

/// How an externally authenticated identity becomes a backend account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OAuthStrategy {
    /// One idempotent call to the backend's provider upsert endpoint.
    #[default]
    Upsert,
    /// Register with a random password, then log in with the sentinel password.
    Legacy,
}

/// Google OAuth client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: Some(PLACEHOLDER_CLIENT_ID.to_string()),
            client_secret: Some(PLACEHOLDER_CLIENT_SECRET.to_string()),
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
        }
    }
}

/// OAuth sign-in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub strategy: OAuthStrategy,
    pub legacy_password: String,
    pub google: GoogleConfig,
}

impl OAuthConfig {
    const DEFAULT_LEGACY_PASSWORD: &str = "google-oauth-user";
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            strategy: OAuthStrategy::default(),
            legacy_password: Self::DEFAULT_LEGACY_PASSWORD.to_string(),
            google: GoogleConfig::default(),
        }
    }
}

/// Resolved Google client credentials.
#[derive(Debug, Clone)]
pub struct GoogleClient {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl GoogleClient {
    /// Returns true when either credential is still the shipped placeholder.
    pub fn uses_placeholder(&self) -> bool {
        self.client_id == PLACEHOLDER_CLIENT_ID || self.client_secret == PLACEHOLDER_CLIENT_SECRET
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the events backend
    pub api_base_url: String,

    /// Timeout for backend requests in seconds (0 disables)
    pub request_timeout_secs: u32,

    /// OAuth sign-in configuration
    pub oauth: OAuthConfig,
}

impl Config {
    const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
    /// Default is disabled
    const DEFAULT_REQUEST_TIMEOUT_SECS: u32 = 0;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the backend base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the chosen value is not a valid URL.
    pub fn api_base_url(&self) -> Result<String> {
        let env_value = std::env::var(API_URL_ENV).ok();
        resolve_base_url(
            env_value.as_deref(),
            Some(&self.api_base_url),
            Self::DEFAULT_API_BASE_URL,
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.request_timeout_secs)))
        }
    }

    /// Resolves Google client credentials with precedence: env > config > placeholder.
    pub fn google_client(&self) -> GoogleClient {
        let google = &self.oauth.google;
        GoogleClient {
            client_id: resolve_secret(
                std::env::var(GOOGLE_CLIENT_ID_ENV).ok().as_deref(),
                google.client_id.as_deref(),
                PLACEHOLDER_CLIENT_ID,
            ),
            client_secret: resolve_secret(
                std::env::var(GOOGLE_CLIENT_SECRET_ENV).ok().as_deref(),
                google.client_secret.as_deref(),
                PLACEHOLDER_CLIENT_SECRET,
            ),
            authorize_url: google.authorize_url.clone(),
            token_url: google.token_url.clone(),
            userinfo_url: google.userinfo_url.clone(),
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Uses the embedded template for structure/comments and merges
    /// generated values from `Config::default()` into it.
    ///
    /// # Errors
    /// Returns an error if serialization or template parsing fails.
    pub fn generate() -> Result<String> {
        use toml_edit::DocumentMut;

        let config = Config::default();
        let generated_toml =
            toml::to_string(&config).context("Failed to serialize default config to TOML")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("Failed to parse default config template")?;

        let generated_doc: DocumentMut = generated_toml
            .parse()
            .context("Failed to parse generated config")?;

        merge_items(doc.as_table_mut(), generated_doc.as_table());

        Ok(doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            oauth: OAuthConfig::default(),
        }
    }
}

/// Overlays `source` values onto `target`, keeping `target`'s comments.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(arr) => {
                target[key] = Item::ArrayOfTables(arr.clone());
            }
            Item::None => {}
        }
    }
}

/// Picks the first non-blank value of env, config, then falls back to `default_url`.
fn resolve_base_url(
    env_value: Option<&str>,
    config_value: Option<&str>,
    default_url: &str,
) -> Result<String> {
    let chosen = [env_value, config_value]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or(default_url);

    url::Url::parse(chosen).with_context(|| format!("Invalid API base URL: {chosen}"))?;
    Ok(chosen.trim_end_matches('/').to_string())
}

fn resolve_secret(env_value: Option<&str>, config_value: Option<&str>, placeholder: &str) -> String {
    [env_value, config_value]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or(placeholder)
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:5000");
        assert_eq!(config.request_timeout_secs, 0);
        assert_eq!(config.oauth.strategy, OAuthStrategy::Upsert);
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "api_base_url = \"https://events.example.com\"\n[oauth]\nstrategy = \"legacy\"\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.api_base_url, "https://events.example.com");
        assert_eq!(config.oauth.strategy, OAuthStrategy::Legacy);
        assert_eq!(config.oauth.legacy_password, "google-oauth-user");
        assert_eq!(
            config.oauth.google.token_url,
            "https://oauth2.googleapis.com/token"
        );
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "api_base_url = [").unwrap();

        assert!(Config::load_from(&config_path).is_err());
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("api_base_url = \"http://localhost:5000\""));
        assert!(contents.contains("# Timeout for each backend request"));

        let loaded = Config::load_from(&config_path).unwrap();
        assert_eq!(loaded.api_base_url, Config::default().api_base_url);
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        let result = Config::init(&config_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_generate_keeps_template_comments() {
        let generated = Config::generate().unwrap();
        assert!(generated.contains("# eventdeck Configuration"));
        assert!(generated.contains("strategy = \"upsert\""));
        assert!(generated.contains("legacy_password = \"google-oauth-user\""));
    }

    #[test]
    fn test_request_timeout_zero_disables() {
        let config = Config {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), None);

        let config = Config {
            request_timeout_secs: 7,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_resolve_base_url_precedence() {
        let url = resolve_base_url(
            Some("https://env.example.com/"),
            Some("https://config.example.com"),
            "http://localhost:5000",
        )
        .unwrap();
        assert_eq!(url, "https://env.example.com");

        let url = resolve_base_url(Some("  "), Some("https://config.example.com"), "x").unwrap();
        assert_eq!(url, "https://config.example.com");

        let url = resolve_base_url(None, Some(""), "http://localhost:5000").unwrap();
        assert_eq!(url, "http://localhost:5000");
    }

    #[test]
    fn test_resolve_base_url_rejects_garbage() {
        let err = resolve_base_url(None, Some("not a url"), "http://localhost:5000").unwrap_err();
        assert!(err.to_string().contains("Invalid API base URL"));
    }

    #[test]
    fn test_google_client_placeholder_detected() {
        let client = GoogleClient {
            client_id: "dummy-client-id".to_string(),
            client_secret: "real-secret".to_string(),
            authorize_url: String::new(),
            token_url: String::new(),
            userinfo_url: String::new(),
        };
        assert!(client.uses_placeholder());

        assert_eq!(resolve_secret(None, Some("abc"), "dummy"), "abc");
        assert_eq!(resolve_secret(Some("env"), Some("abc"), "dummy"), "env");
        assert_eq!(resolve_secret(None, None, "dummy"), "dummy");
    }
}
