//! Runtime configuration.
//!
//! Read from `config/default.toml` (or `--config PATH`), then overridden by
//! `PEDSAGE_*` environment variables. Every field has a default, so a
//! missing default file or a partial file is fine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pedsage_memory::{DEFAULT_SEARCH_LIMIT, DEFAULT_STORAGE_KEY, RELEVANT_MEMORY_LIMIT};
use serde::{Deserialize, Serialize};

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PedsageConfig {
    pub storage: StorageConfig,
    pub memory: MemoryConfig,
    pub log: LogConfig,
}

/// `[storage]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file.
    pub path: PathBuf,
    /// Key the memory snapshot is stored under.
    pub key: String,
    /// Keep everything in process memory; nothing survives exit.
    pub ephemeral: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/pedsage.db"),
            key: DEFAULT_STORAGE_KEY.to_string(),
            ephemeral: false,
        }
    }
}

/// `[memory]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Ranked memories spliced into each prompt.
    pub relevant_limit: usize,
    /// Default result count for `search`.
    pub search_limit: usize,
    /// Recent messages included in the prompt context.
    pub context_window: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            relevant_limit: RELEVANT_MEMORY_LIMIT,
            search_limit: DEFAULT_SEARCH_LIMIT,
            context_window: 6,
        }
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// `[log]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl PedsageConfig {
    /// Parse a TOML document. Absent sections and keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid configuration")
    }

    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] when `None`.
    ///
    /// A missing default file yields defaults. A missing explicit file and a
    /// malformed file of either kind are errors.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Apply `PEDSAGE_*` overrides, reading variables through `lookup`.
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("PEDSAGE_DB_PATH") {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(key) = get("PEDSAGE_STORAGE_KEY") {
            self.storage.key = key;
        }
        if let Some(level) = get("PEDSAGE_LOG") {
            self.log.level = level;
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PedsageConfig::default();
        assert_eq!(config.storage.path, PathBuf::from("data/pedsage.db"));
        assert_eq!(config.storage.key, "pedsage-memory");
        assert!(!config.storage.ephemeral);
        assert_eq!(config.memory.relevant_limit, 5);
        assert_eq!(config.memory.search_limit, 10);
        assert_eq!(config.memory.context_window, 6);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, LogFormat::Compact);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = PedsageConfig::from_toml_str(
            r#"
            [memory]
            relevant_limit = 3

            [log]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.memory.relevant_limit, 3);
        assert_eq!(config.memory.search_limit, 10);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(PedsageConfig::from_toml_str("[memory]\nrelevant_limit = \"five\"").is_err());
        assert!(PedsageConfig::from_toml_str("[storage").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(PedsageConfig::load(Some(missing.as_path())).is_err());
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pedsage.toml");
        std::fs::write(&path, "[storage]\nkey = \"clinic-a\"\nephemeral = true\n").unwrap();

        let config = PedsageConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.storage.key, "clinic-a");
        assert!(config.storage.ephemeral);
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PEDSAGE_DB_PATH", "/tmp/other.db"),
            ("PEDSAGE_STORAGE_KEY", "ward-7"),
            ("PEDSAGE_LOG", ""),
        ]);

        let mut config = PedsageConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.storage.path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.storage.key, "ward-7");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn shipped_default_file_parses_to_defaults() {
        let shipped = include_str!("../../../config/default.toml");
        let config = PedsageConfig::from_toml_str(shipped).unwrap();
        assert_eq!(config, PedsageConfig::default());
    }
}
