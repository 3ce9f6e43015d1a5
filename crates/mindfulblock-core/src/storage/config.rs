//! TOML-based application configuration.
//!
//! Stores:
//! - the global blocking switch and clean-on-exit behaviour
//! - UI language
//! - companion endpoint bind address
//! - extension-side polling settings
//! - an optional hosts file override
//!
//! Configuration is stored at `~/.config/mindfulblock/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::language::Language;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockingConfig {
    /// Global switch; when off every navigation is allowed and the OS
    /// sink receives no active rules.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Remove the managed hosts section when `serve` exits.
    #[serde(default)]
    pub clean_on_exit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnforcementConfig {
    /// Hosts file to manage instead of the platform default.
    #[serde(default)]
    pub hosts_path: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/mindfulblock/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub extension: ExtensionConfig,
    #[serde(default)]
    pub enforcement: EnforcementConfig,
}

fn default_true() -> bool {
    true
}
fn default_bind() -> String {
    "127.0.0.1:17430".into()
}
fn default_server_url() -> String {
    "http://127.0.0.1:17430".into()
}
fn default_poll_interval() -> u64 {
    30
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            clean_on_exit: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::default(),
            blocking: BlockingConfig::default(),
            server: ServerConfig::default(),
            extension: ExtensionConfig::default(),
            enforcement: EnforcementConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot set a whole section".to_string()))
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit
    /// the key's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Every leaf key with its current value, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out.sort();
        out
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert!(parsed.blocking.enabled);
        assert_eq!(parsed.language, Language::Vi);
        assert_eq!(parsed.server.bind, "127.0.0.1:17430");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("language = \"en\"\n[blocking]\nenabled = false\n").unwrap();
        assert_eq!(parsed.language, Language::En);
        assert!(!parsed.blocking.enabled);
        assert_eq!(parsed.extension.poll_interval_secs, 30);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("blocking.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("extension.poll_interval_secs").as_deref(), Some("30"));
        assert_eq!(cfg.get("language").as_deref(), Some("vi"));
        assert!(cfg.get("blocking.missing_key").is_none());
    }

    #[test]
    fn set_preserves_types() {
        let mut cfg = Config::default();
        cfg.set("blocking.enabled", "false").unwrap();
        cfg.set("extension.poll_interval_secs", "45").unwrap();
        cfg.set("language", "en").unwrap();
        cfg.set("enforcement.hosts_path", "/tmp/hosts").unwrap();
        assert!(!cfg.blocking.enabled);
        assert_eq!(cfg.extension.poll_interval_secs, 45);
        assert_eq!(cfg.language, Language::En);
        assert_eq!(cfg.enforcement.hosts_path.as_deref(), Some("/tmp/hosts"));
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("blocking.nonexistent", "1"),
            Err(crate::error::CoreError::Config(ConfigError::UnknownKey(_)))
        ));
        assert!(cfg.set("blocking.enabled", "not_a_bool").is_err());
        assert!(cfg.set("extension.poll_interval_secs", "-3").is_err());
        assert!(cfg.set("language", "fr").is_err());
        assert!(cfg.set("blocking", "true").is_err());
        assert!(cfg.blocking.enabled);
    }

    #[test]
    fn entries_lists_leaf_keys() {
        let keys: Vec<String> = Config::default().entries().into_iter().map(|(k, _)| k).collect();
        assert!(keys.contains(&"blocking.clean_on_exit".to_string()));
        assert!(keys.contains(&"server.bind".to_string()));
        assert!(keys.contains(&"language".to_string()));
    }

    #[test]
    fn load_from_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert!(cfg.blocking.enabled);

        let mut cfg = cfg;
        cfg.set("blocking.clean_on_exit", "true").unwrap();
        cfg.save_to(&path).unwrap();
        assert!(Config::load_from(&path).unwrap().blocking.clean_on_exit);
    }

    #[test]
    fn unreadable_config_is_an_error_not_a_reset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let garbage = [0xffu8, 0xfe, b'\n'];
        std::fs::write(&path, garbage).unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(CoreError::Config(ConfigError::LoadFailed { .. }))
        ));
        assert_eq!(std::fs::read(&path).unwrap(), garbage);

        assert!(Config::load_from(dir.path()).is_err());
        assert!(dir.path().is_dir());
    }
}
