//! Application configuration.
//!
//! Settings are resolved once at start-up: defaults, then the optional file
//! at `~/.config/decifracv/config.json`, then `DECIFRACV_*` environment
//! variables. The API key is only ever taken from the environment and is
//! never written back to disk.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::auth::{
    CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore,
    StaticCredential, StoreError,
};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "decifracv";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

/// HTTP request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_BASE_URL: &str = "DECIFRACV_API_BASE_URL";
pub const ENV_API_KEY: &str = "DECIFRACV_API_KEY";
pub const ENV_SESSION_STORE: &str = "DECIFRACV_SESSION_STORE";
pub const ENV_TIMEOUT_SECS: &str = "DECIFRACV_TIMEOUT_SECS";

/// Where the session token is kept between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStoreKind {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for SessionStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(SessionStoreKind::File),
            "keyring" => Ok(SessionStoreKind::Keyring),
            "memory" => Ok(SessionStoreKind::Memory),
            other => bail!("unknown session store '{}' (expected file, keyring or memory)", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    #[serde(skip)]
    pub api_key: Option<StaticCredential>,
    pub session_store: SessionStoreKind,
    pub request_timeout_secs: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            session_store: SessionStoreKind::default(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the user config file and the process environment
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(Some(&path), |key| std::env::var(key).ok())
    }

    pub fn load_from<F>(path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::read_file(path)?.unwrap_or_default(),
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.base_url()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(Some(config))
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = present(ENV_API_BASE_URL) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(key) = present(ENV_API_KEY) {
            self.api_key = Some(
                StaticCredential::parse(&key).with_context(|| format!("Invalid {}", ENV_API_KEY))?,
            );
        }
        if let Some(store) = present(ENV_SESSION_STORE) {
            self.session_store = store.parse()?;
        }
        if let Some(timeout) = present(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}", ENV_TIMEOUT_SECS))?;
        }
        Ok(())
    }

    /// Persist `email` as the default for the next login prompt.
    ///
    /// Only this field is written; environment overrides stay out of the file.
    pub fn remember_email(&mut self, email: &str) -> Result<()> {
        let path = Self::config_path()?;
        let mut on_disk = Self::read_file(&path)?.unwrap_or_default();
        on_disk.last_email = Some(email.to_string());
        on_disk.save_to(&path)?;
        self.last_email = Some(email.to_string());
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf, StoreError> {
        let cache_dir = dirs::cache_dir().ok_or(StoreError::NoStorageLocation)?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api_base_url)
            .with_context(|| format!("Invalid API base URL '{}'", self.api_base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("API base URL must be http or https, got '{}'", self.api_base_url);
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Open the configured session backend
    pub fn open_store(&self) -> Result<Box<dyn CredentialStore>, StoreError> {
        Ok(match self.session_store {
            SessionStoreKind::File => Box::new(FileCredentialStore::open(self.cache_dir()?)?),
            SessionStoreKind::Keyring => Box::new(KeyringCredentialStore::open()?),
            SessionStoreKind::Memory => Box::new(MemoryCredentialStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::load_from(None, env(&[])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.api_key.is_none());
        assert_eq!(config.session_store, SessionStoreKind::File);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_env_overrides_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{"api_base_url": "https://file.example", "session_store": "keyring", "last_email": "ana@mux.com"}"#,
        )
        .unwrap();

        let config = Config::load_from(
            Some(&path),
            env(&[
                (ENV_API_BASE_URL, "https://api.decifracv.example"),
                (ENV_API_KEY, "421406e01293a635"),
                (ENV_TIMEOUT_SECS, "5"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://api.decifracv.example");
        assert_eq!(config.api_key.as_ref().map(|k| k.as_str()), Some("421406e01293a635"));
        assert_eq!(config.session_store, SessionStoreKind::Keyring);
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.last_email.as_deref(), Some("ana@mux.com"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let config = Config::load_from(None, env(&[(ENV_API_KEY, "  ")])).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::load_from(None, env(&[(ENV_API_BASE_URL, "ftp://x")])).is_err());
        assert!(Config::load_from(None, env(&[(ENV_API_BASE_URL, "not a url")])).is_err());
        assert!(Config::load_from(None, env(&[(ENV_API_KEY, "has space")])).is_err());
        assert!(Config::load_from(None, env(&[(ENV_SESSION_STORE, "cookie")])).is_err());
        assert!(Config::load_from(None, env(&[(ENV_TIMEOUT_SECS, "soon")])).is_err());
    }

    #[test]
    fn test_api_key_never_saved() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        let config = Config::load_from(None, env(&[(ENV_API_KEY, "421406e01293a635")])).unwrap();
        config.save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("421406e01293a635"));
        assert!(!contents.contains("api_key"));
    }

    #[test]
    fn test_memory_store_selection() {
        let config = Config::load_from(None, env(&[(ENV_SESSION_STORE, "Memory")])).unwrap();
        let store = config.open_store().unwrap();
        assert_eq!(store.backend(), "memory");
    }
}
