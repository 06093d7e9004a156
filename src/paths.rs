//! XDG-compliant path resolution for the journal.
//!
//! Provides [`JournalPaths`], the default config, data and fallback-pack
//! locations following
//! the XDG Base Directory Specification.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

const APP_DIR: &str = "mirror-journal";

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(mirror::paths::no_home),
        help("Set the HOME environment variable, or set `data_dir` in the journal config.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(mirror::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Default directories for the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalPaths {
    /// `$XDG_CONFIG_HOME/mirror-journal/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/mirror-journal/`
    pub data_dir: PathBuf,
}

impl JournalPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        Self::resolve_with(|name| std::env::var(name).ok())
    }

    fn resolve_with(var: impl Fn(&str) -> Option<String>) -> PathResult<Self> {
        let home = var("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .ok_or(PathError::NoHome)?;
        let xdg = |name: &str, fallback: &str| {
            var(name)
                .filter(|d| !d.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| home.join(fallback))
                .join(APP_DIR)
        };

        Ok(Self {
            config_dir: xdg("XDG_CONFIG_HOME", ".config"),
            data_dir: xdg("XDG_DATA_HOME", ".local/share"),
        })
    }

    /// Create all directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.store_dir()] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Path to the journal config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Directory holding the journal database.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    /// Directory checked for fallback pack overrides.
    pub fn fallback_dir(&self) -> PathBuf {
        self.config_dir.join("fallback")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }

    #[test]
    fn home_fallbacks() {
        let paths = JournalPaths::resolve_with(vars(&[("HOME", "/home/ada")])).unwrap();
        assert_eq!(paths.config_dir, PathBuf::from("/home/ada/.config/mirror-journal"));
        assert_eq!(paths.data_dir, PathBuf::from("/home/ada/.local/share/mirror-journal"));
        assert_eq!(
            paths.store_dir(),
            PathBuf::from("/home/ada/.local/share/mirror-journal/store")
        );
    }

    #[test]
    fn xdg_overrides_win() {
        let paths = JournalPaths::resolve_with(vars(&[
            ("HOME", "/home/ada"),
            ("XDG_CONFIG_HOME", "/cfg"),
            ("XDG_DATA_HOME", ""),
        ]))
        .unwrap();
        assert_eq!(paths.config_file(), PathBuf::from("/cfg/mirror-journal/config.toml"));
        assert_eq!(paths.fallback_dir(), PathBuf::from("/cfg/mirror-journal/fallback"));
        // Empty values are ignored.
        assert_eq!(paths.data_dir, PathBuf::from("/home/ada/.local/share/mirror-journal"));
    }

    #[test]
    fn missing_home_is_an_error() {
        let err = JournalPaths::resolve_with(vars(&[])).unwrap_err();
        assert!(matches!(err, PathError::NoHome));
    }

    #[test]
    fn ensure_dirs_creates_the_layout() {
        let root = tempfile::tempdir().unwrap();
        let paths = JournalPaths {
            config_dir: root.path().join("cfg"),
            data_dir: root.path().join("data"),
        };
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();
        assert!(paths.store_dir().is_dir());
        assert!(paths.config_dir.is_dir());
    }
}
