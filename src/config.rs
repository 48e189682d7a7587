//! Configuration loading and management.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub clone: CloneConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            clone: CloneConfig::default(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".studio/studio.db")
}

/// Clone workflow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneConfig {
    /// Identity used for context_store entries and named-query resolution.
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Recorded as created_by/updated_by on session rows.
    #[serde(default = "default_actor")]
    pub actor: String,

    /// Maximum rows returned by session listings.
    #[serde(default = "default_list_limit")]
    pub list_limit: i64,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            identity: default_identity(),
            actor: default_actor(),
            list_limit: default_list_limit(),
        }
    }
}

fn default_identity() -> String {
    "studio@localhost".to_string()
}

fn default_actor() -> String {
    "studio".to_string()
}

fn default_list_limit() -> i64 {
    10
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the default location or return defaults,
    /// applying environment overrides.
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::load(".studio/config.yaml") {
            return config;
        }

        let mut config = Self::default();

        if let Ok(db_path) = std::env::var("STUDIO_CLONE_DB_PATH") {
            config.store.db_path = PathBuf::from(db_path);
        }

        if let Ok(identity) = std::env::var("STUDIO_CLONE_IDENTITY") {
            config.clone.identity = identity;
        }

        if let Ok(actor) = std::env::var("STUDIO_CLONE_ACTOR") {
            config.clone.actor = actor;
        }

        config
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.store.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
