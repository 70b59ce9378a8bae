//! Theory configuration with environment variable and file-based loading.
//!
//! Environment variables:
//! - `HARMONY_DYNAMIC_CACHING`: Set to "false" to stop registering derived names
//! - `HARMONY_PRECACHE`: Set to "false" to skip tweak expansion at bootstrap
//! - `HARMONY_SPELLING`: "sharps" or "flats"
//! - `HARMONY_MAX_RARITY`: Rarity cap for generated vocabulary
//!
//! Default file: `~/.config/harmony/config.toml`

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::note::Spelling;
use crate::scoring::ConsonanceScale;

/// Configuration for the name registry and scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TheoryConfig {
    /// Register names derived at lookup time so later lookups hit directly.
    pub dynamic_caching: bool,

    /// Run tweak expansion at bootstrap. When off only the seeds are registered.
    pub precache_vocabulary: bool,

    /// Accidentals used when spelling bare pitch classes.
    pub spelling: Spelling,

    /// Highest rarity tier generated vocabulary may reach.
    pub max_rarity: u32,

    pub consonance: ConsonanceScale,
}

impl Default for TheoryConfig {
    fn default() -> Self {
        Self {
            dynamic_caching: true,
            precache_vocabulary: true,
            spelling: Spelling::Sharps,
            max_rarity: 6,
            consonance: ConsonanceScale::default(),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no" | "off"))
}

/// `~/.config/harmony/config.toml` on Linux, the platform equivalent elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "harmony")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl TheoryConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(flag) = env_flag("HARMONY_DYNAMIC_CACHING") {
            config.dynamic_caching = flag;
        }
        if let Some(flag) = env_flag("HARMONY_PRECACHE") {
            config.precache_vocabulary = flag;
        }
        if let Ok(spelling) = env::var("HARMONY_SPELLING") {
            config.spelling = match spelling.parse() {
                Ok(spelling) => spelling,
                Err(_) => bail!("HARMONY_SPELLING must be 'sharps' or 'flats', got '{spelling}'"),
            };
        }
        if let Ok(rarity) = env::var("HARMONY_MAX_RARITY") {
            config.max_rarity = rarity
                .parse()
                .with_context(|| format!("invalid HARMONY_MAX_RARITY: {rarity}"))?;
        }
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to environment.
    ///
    /// The file should contain a `[theory]` section:
    /// ```toml
    /// [theory]
    /// dynamic_caching = true
    /// spelling = "flats"
    /// max_rarity = 5
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let table: toml::Table = contents
            .parse()
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;

        if let Some(section) = table.get("theory") {
            let config: TheoryConfig = section
                .clone()
                .try_into()
                .context("failed to parse [theory] section")?;
            Ok(config)
        } else {
            Self::from_env()
        }
    }

    /// The user's config file when it exists, otherwise the environment.
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Self::from_env(),
        }
    }
}
