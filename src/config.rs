//! Journal configuration, persisted as TOML.
//!
//! Every field has a default, so an empty or missing file yields a working
//! offline journal under the XDG data directory. Unknown keys are ignored.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::error::JournalResult;
use crate::gateway::{AiGateway, FallbackBook, GeminiConfig, GeminiGateway, Reflector};
use crate::model::Language;
use crate::paths::JournalPaths;
use crate::state::{JournalStore, PersistMode, StoreOptions};

/// Errors from reading or writing the config file.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read journal config: {path}")]
    #[diagnostic(
        code(mirror::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse journal config {path}: {message}")]
    #[diagnostic(
        code(mirror::config::parse),
        help("Check the TOML syntax. Every key is optional; delete a key to use its default.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write journal config: {path}")]
    #[diagnostic(
        code(mirror::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level journal configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Database directory. Defaults to the XDG data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Directory with fallback pack overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_dir: Option<PathBuf>,
    /// Language for a first-run profile.
    #[serde(default, deserialize_with = "lenient_language")]
    pub default_language: Language,
    /// Show the example entry until the first save.
    #[serde(default = "default_true")]
    pub seed_history: bool,
    #[serde(default)]
    pub persist: PersistConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// When records are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistConfig {
    #[serde(default)]
    pub mode: PersistModeName,
    /// Debounce window for `mode = "debounced"`.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistModeName {
    #[default]
    Immediate,
    Debounced,
}

/// Reflection model settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Master switch; when off every reflection comes from the fallback book.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_image_fallback_model")]
    pub image_fallback_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_base_url() -> String {
    GeminiConfig::default().base_url
}
fn default_model() -> String {
    GeminiConfig::default().model
}
fn default_image_fallback_model() -> String {
    GeminiConfig::default().image_fallback_model
}
fn default_timeout_secs() -> u64 {
    GeminiConfig::default().timeout_secs
}

fn lenient_language<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Language, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            mode: PersistModeName::default(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_base_url(),
            model: default_model(),
            image_fallback_model: default_image_fallback_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            fallback_dir: None,
            default_language: Language::default(),
            seed_history: true,
            persist: PersistConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl JournalConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Load from `path`, or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no journal config, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn persist_mode(&self) -> PersistMode {
        match self.persist.mode {
            PersistModeName::Immediate => PersistMode::Immediate,
            PersistModeName::Debounced => {
                PersistMode::Debounced(Duration::from_millis(self.persist.debounce_ms))
            }
        }
    }

    pub fn to_store_options(&self) -> StoreOptions {
        StoreOptions {
            persist: self.persist_mode(),
            language: self.default_language,
            seed_history: self.seed_history,
            ..StoreOptions::default()
        }
    }

    pub fn to_gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            base_url: self.gateway.base_url.clone(),
            model: self.gateway.model.clone(),
            image_fallback_model: self.gateway.image_fallback_model.clone(),
            api_key: self.gateway.api_key.clone(),
            timeout_secs: self.gateway.timeout_secs,
        }
    }

    /// The configured database directory, or the XDG default.
    pub fn resolve_data_dir(&self) -> JournalResult<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(JournalPaths::resolve()?.store_dir()),
        }
    }

    /// Open the durable store this config points at.
    pub fn open_store(&self) -> JournalResult<JournalStore> {
        let dir = self.resolve_data_dir()?;
        JournalStore::open_dir(&dir, self.to_store_options())
    }

    /// The fallback override directory: the configured one, else the XDG
    /// one when it exists.
    pub fn resolve_fallback_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.fallback_dir {
            return Some(dir.clone());
        }
        match JournalPaths::resolve() {
            Ok(paths) => Some(paths.fallback_dir()).filter(|dir| dir.is_dir()),
            Err(e) => {
                tracing::debug!(error = %e, "no XDG fallback directory");
                None
            }
        }
    }

    /// Build the reflector: the Gemini gateway when enabled and keyed, the
    /// fallback book (with overrides, if any) in every case.
    pub fn reflector(&self) -> JournalResult<Reflector> {
        let fallback = match self.resolve_fallback_dir() {
            Some(dir) => FallbackBook::from_dir(&dir)?,
            None => FallbackBook::bundled(),
        };
        let gateway: Option<Arc<dyn AiGateway>> = if !self.gateway.enabled {
            None
        } else {
            match GeminiGateway::new(self.to_gemini_config()) {
                Ok(gateway) => Some(Arc::new(gateway)),
                Err(e) => {
                    tracing::info!(error = %e, "reflection model not configured, running offline");
                    None
                }
            }
        };
        Ok(Reflector::new(gateway, fallback)
            .with_timeout(Duration::from_secs(self.gateway.timeout_secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = JournalConfig::parse("", Path::new("config.toml")).unwrap();
        assert_eq!(config, JournalConfig::default());
        assert_eq!(config.gateway.timeout_secs, 15);
        assert!(config.seed_history);
        assert_eq!(config.persist_mode(), PersistMode::Immediate);
    }

    #[test]
    fn partial_sections_fill_in() {
        let config = JournalConfig::parse(
            r#"
            default_language = "zh"

            [persist]
            mode = "debounced"

            [gateway]
            api_key = "k"
            "#,
            Path::new("config.toml"),
        )
        .unwrap();
        assert_eq!(config.default_language, Language::Chinese);
        assert_eq!(
            config.persist_mode(),
            PersistMode::Debounced(Duration::from_millis(500))
        );
        let gemini = config.to_gemini_config();
        assert_eq!(gemini.api_key.as_deref(), Some("k"));
        assert_eq!(gemini.model, GeminiConfig::default().model);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = JournalConfig::parse("persist = 3", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let config = JournalConfig {
            data_dir: Some(dir.path().join("store")),
            default_language: Language::Spanish,
            ..JournalConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(JournalConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = JournalConfig::load_or_default(&dir.path().join("none.toml")).unwrap();
        assert_eq!(config, JournalConfig::default());
        assert!(JournalConfig::load(&dir.path().join("none.toml")).is_err());
    }

    #[test]
    fn store_options_follow_config() {
        let config = JournalConfig {
            default_language: Language::Chinese,
            seed_history: false,
            ..JournalConfig::default()
        };
        let options = config.to_store_options();
        assert_eq!(options.language, Language::Chinese);
        assert!(!options.seed_history);
    }

    #[test]
    fn keyless_gateway_runs_offline() {
        let config = JournalConfig::default();
        let reflector = config.reflector().unwrap();
        let prefs = crate::model::Preferences::default();
        let insight = reflector.insight(&prefs, "Ada", &[]);
        assert!(insight.is_fallback());
    }

    #[test]
    fn open_store_uses_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = JournalConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..JournalConfig::default()
        };
        let store = config.open_store().unwrap();
        assert_eq!(store.history().len(), 1);
        drop(store);
        assert!(dir.path().join(crate::store::durable::DB_FILE).is_file());
    }

    #[test]
    fn configured_fallback_dir_overrides_packs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("english.toml"), "not = [valid").unwrap();
        let config = JournalConfig {
            fallback_dir: Some(dir.path().to_path_buf()),
            ..JournalConfig::default()
        };
        assert_eq!(config.resolve_fallback_dir(), Some(dir.path().to_path_buf()));
        // The override is read, so a broken pack surfaces as an error.
        assert!(config.reflector().is_err());
    }
}
