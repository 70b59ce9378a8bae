//! Search options with environment variable and file-based loading.
//!
//! Environment variables:
//! - `HARMONY_MATCH_MIN_PRECISION` / `HARMONY_MATCH_MIN_RECALL`: acceptance thresholds
//! - `HARMONY_MATCH_MIN_LIKELIHOOD` / `HARMONY_MATCH_MIN_CONSONANCE`: score floors
//! - `HARMONY_MATCH_MAX_RESULTS`: Result list length
//! - `HARMONY_MATCH_EXACT_CUTOFF`: Largest note set searched by permutation
//! - `HARMONY_MATCH_ALLOW_FUZZY`: Set to "false" to make oversized input an error
//! - `HARMONY_MATCH_SPELLING`: "sharps" or "flats" for notes given as MIDI numbers
//!
//! Default file: `~/.config/harmony/config.toml`

use anyhow::{bail, Context, Result};
use harmony::config::default_config_path;
use harmony::Spelling;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::path::Path;

use crate::types::Scores;

/// Options for chord and key matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub min_precision: f64,
    pub min_recall: f64,
    pub min_likelihood: f64,
    pub min_consonance: f64,

    /// Results kept after ranking.
    pub max_results: usize,

    /// Largest distinct note count searched by permutation.
    pub exact_cutoff: usize,

    /// Fall back to fuzzy search above the cutoff or when exact search finds nothing.
    pub allow_fuzzy: bool,

    /// Weight multiplier per simple degree (1..=7). Missing degrees weigh 1.
    pub degree_weights: BTreeMap<u8, f64>,

    /// Extra weight for every note of the first chord in a progression.
    pub first_chord_boost: f64,

    /// Extra weight for every note of the last chord in a progression.
    pub last_chord_boost: f64,

    /// Extra weight for the candidate key's own tonic.
    pub tonic_boost: f64,

    /// Names accepted whatever their likelihood and consonance.
    pub whitelist: BTreeSet<String>,

    /// Names never returned.
    pub blacklist: BTreeSet<String>,

    /// Spelling for notes built from MIDI numbers; the registry's when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spelling: Option<Spelling>,

    /// Close a progression with an implied tonic when scoring cadences.
    pub pad_tonic: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_precision: 0.5,
            min_recall: 0.5,
            min_likelihood: 0.0,
            min_consonance: 0.0,
            max_results: 10,
            exact_cutoff: 5,
            allow_fuzzy: true,
            degree_weights: BTreeMap::from([(3, 2.0), (5, 0.5)]),
            first_chord_boost: 1.0,
            last_chord_boost: 1.0,
            tonic_boost: 1.0,
            whitelist: BTreeSet::new(),
            blacklist: BTreeSet::new(),
            spelling: None,
            pad_tonic: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .with_context(|| format!("invalid {name}: {value}")),
        Err(_) => Ok(None),
    }
}

impl MatchConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = env_parse("HARMONY_MATCH_MIN_PRECISION")? {
            config.min_precision = value;
        }
        if let Some(value) = env_parse("HARMONY_MATCH_MIN_RECALL")? {
            config.min_recall = value;
        }
        if let Some(value) = env_parse("HARMONY_MATCH_MIN_LIKELIHOOD")? {
            config.min_likelihood = value;
        }
        if let Some(value) = env_parse("HARMONY_MATCH_MIN_CONSONANCE")? {
            config.min_consonance = value;
        }
        if let Some(value) = env_parse("HARMONY_MATCH_MAX_RESULTS")? {
            config.max_results = value;
        }
        if let Some(value) = env_parse("HARMONY_MATCH_EXACT_CUTOFF")? {
            config.exact_cutoff = value;
        }
        if let Ok(flag) = env::var("HARMONY_MATCH_ALLOW_FUZZY") {
            config.allow_fuzzy = !matches!(flag.to_lowercase().as_str(), "false" | "0" | "no" | "off");
        }
        if let Ok(spelling) = env::var("HARMONY_MATCH_SPELLING") {
            config.spelling = match spelling.parse() {
                Ok(spelling) => Some(spelling),
                Err(_) => bail!("HARMONY_MATCH_SPELLING must be 'sharps' or 'flats', got '{spelling}'"),
            };
        }
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to environment.
    ///
    /// The file should contain a `[matching]` section:
    /// ```toml
    /// [matching]
    /// min_recall = 0.75
    /// exact_cutoff = 4
    /// blacklist = ["5"]
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let table: toml::Table = contents
            .parse()
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;

        if let Some(section) = table.get("matching") {
            let config: MatchConfig = section
                .clone()
                .try_into()
                .context("failed to parse [matching] section")?;
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

    /// The same options with every threshold at zero.
    pub fn relaxed(&self) -> Self {
        Self {
            min_precision: 0.0,
            min_recall: 0.0,
            min_likelihood: 0.0,
            min_consonance: 0.0,
            ..self.clone()
        }
    }

    /// Weight multiplier for a degree, folded into one octave.
    pub fn degree_weight(&self, degree: u8) -> f64 {
        let simple = (degree.max(1) - 1) % 7 + 1;
        self.degree_weights.get(&simple).copied().unwrap_or(1.0)
    }

    /// Whether a scored candidate passes the thresholds and name lists.
    pub fn accepts(&self, name: &str, scores: &Scores) -> bool {
        if self.blacklist.contains(name) {
            return false;
        }
        if scores.recall < self.min_recall || scores.precision < self.min_precision {
            return false;
        }
        self.whitelist.contains(name)
            || (scores.likelihood >= self.min_likelihood && scores.consonance >= self.min_consonance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scores(precision: f64, recall: f64, likelihood: f64, consonance: f64) -> Scores {
        Scores {
            precision,
            recall,
            likelihood,
            consonance,
        }
    }

    #[test]
    fn test_default_config() {
        let config = MatchConfig::default();
        assert_eq!(config.exact_cutoff, 5);
        assert_eq!(config.max_results, 10);
        assert!(config.allow_fuzzy);
        assert_eq!(config.degree_weight(3), 2.0);
        assert_eq!(config.degree_weight(5), 0.5);
        assert_eq!(config.degree_weight(10), 2.0);
        assert_eq!(config.degree_weight(9), 1.0);
    }

    #[test]
    fn test_from_env_score_floors() {
        env::set_var("HARMONY_MATCH_MIN_LIKELIHOOD", "0.25");
        env::set_var("HARMONY_MATCH_MIN_CONSONANCE", "0.4");
        let config = MatchConfig::from_env().unwrap();
        assert_eq!(config.min_likelihood, 0.25);
        assert_eq!(config.min_consonance, 0.4);

        env::set_var("HARMONY_MATCH_MIN_CONSONANCE", "loud");
        assert!(MatchConfig::from_env().is_err());
        env::remove_var("HARMONY_MATCH_MIN_LIKELIHOOD");
        env::remove_var("HARMONY_MATCH_MIN_CONSONANCE");
    }

    #[test]
    fn test_from_file_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[matching]\nmin_recall = 0.75\nexact_cutoff = 4\nblacklist = [\"5\"]\nspelling = \"flats\""
        )
        .unwrap();

        let config = MatchConfig::from_file(file.path()).unwrap();
        assert_eq!(config.min_recall, 0.75);
        assert_eq!(config.min_precision, 0.5);
        assert_eq!(config.exact_cutoff, 4);
        assert!(config.blacklist.contains("5"));
        assert_eq!(config.spelling, Some(Spelling::Flats));
    }

    #[test]
    fn test_from_file_rejects_bad_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[matching]\nexact_cutoff = \"many\"").unwrap();
        assert!(MatchConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_relaxed_zeroes_thresholds() {
        let config = MatchConfig {
            min_likelihood: 0.4,
            max_results: 3,
            ..MatchConfig::default()
        };
        let relaxed = config.relaxed();
        assert_eq!(relaxed.min_precision, 0.0);
        assert_eq!(relaxed.min_recall, 0.0);
        assert_eq!(relaxed.min_likelihood, 0.0);
        assert_eq!(relaxed.max_results, 3);
    }

    #[test]
    fn test_acceptance() {
        let mut config = MatchConfig {
            min_likelihood: 0.5,
            ..MatchConfig::default()
        };
        assert!(config.accepts("m", &scores(1.0, 1.0, 0.9, 0.5)));
        assert!(!config.accepts("m", &scores(0.4, 1.0, 0.9, 0.5)));
        assert!(!config.accepts("m", &scores(1.0, 1.0, 0.1, 0.5)));

        config.whitelist.insert("m".into());
        assert!(config.accepts("m", &scores(1.0, 1.0, 0.1, 0.5)));
        assert!(!config.accepts("m", &scores(1.0, 0.2, 0.1, 0.5)));

        config.blacklist.insert("m".into());
        assert!(!config.accepts("m", &scores(1.0, 1.0, 0.9, 0.5)));
    }
}
