use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::algo::misc::ExtensionMap;
use crate::algo::nmf::TopicSettings;
use crate::algo::tfidf::VectorizerSettings;
use crate::error::{FoldersError, Result};

/// Embedded default configuration, compiled from `defaults/config.json`.
/// Users override by placing a file at `$XDG_CONFIG_HOME/folders/config.json`
/// or `$FOLDERS_CONFIG` env var, or passing `--config <path>`.
const EMBEDDED_DEFAULT: &str = include_str!("../defaults/config.json");

/// Everything a planning run needs besides the directory itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub parameters: Parameters,
    /// Category → extensions, used to bucket files that have no text reader.
    #[serde(default)]
    pub extension_map: ExtensionMap,
    /// Words removed from extracted text before embedding and naming.
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub model: ModelSettings,
}

/// User-tunable knobs of a planning run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Words per generated folder name.
    pub folder_word_limit: usize,
    /// Words read from each file.
    pub reading_word_limit: usize,
    /// Minimum similarity, in percent, for two files to share a folder.
    pub similarity_threshold: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            folder_word_limit: 3,
            reading_word_limit: 200,
            similarity_threshold: 50,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<()> {
        if self.similarity_threshold > 100 {
            return Err(FoldersError::InvalidParameter(format!(
                "similarity_threshold must be between 0 and 100, got {}",
                self.similarity_threshold
            )));
        }
        if self.folder_word_limit == 0 {
            return Err(FoldersError::InvalidParameter(
                "folder_word_limit must be at least 1".into(),
            ));
        }
        if self.reading_word_limit == 0 {
            return Err(FoldersError::InvalidParameter(
                "reading_word_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Similarity threshold as a fraction in [0, 1].
    pub fn threshold_fraction(&self) -> f64 {
        self.similarity_threshold as f64 / 100.0
    }
}

/// Settings for the models fitted or queried during planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub topics: usize,
    pub max_iter: usize,
    pub vocab_limit: usize,
    pub min_df: usize,
    pub max_df: f64,
    /// Dimension of the feature-hashing embedder.
    pub embedding_dim: usize,
    /// Joins the words of a generated folder name.
    pub delimiter: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        let topic = TopicSettings::default();
        let vectorizer = VectorizerSettings::default();
        Self {
            topics: topic.topics,
            max_iter: topic.max_iter,
            vocab_limit: topic.vocab_limit,
            min_df: vectorizer.min_df,
            max_df: vectorizer.max_df,
            embedding_dim: 384,
            delimiter: "_".into(),
        }
    }
}

impl ModelSettings {
    pub fn vectorizer(&self) -> VectorizerSettings {
        VectorizerSettings {
            min_df: self.min_df,
            max_df: self.max_df,
        }
    }

    pub fn topic(&self) -> TopicSettings {
        TopicSettings {
            topics: self.topics,
            max_iter: self.max_iter,
            vocab_limit: self.vocab_limit,
        }
    }
}

impl Config {
    /// Stop words, lowercased, for [`crate::algo::tokenizer::preprocess`].
    pub fn stop_word_set(&self) -> HashSet<String> {
        self.stop_words.iter().map(|w| w.to_lowercase()).collect()
    }
}

/// Load the configuration using this resolution order:
///
/// 1. `$FOLDERS_CONFIG` env var (path to JSON file)
/// 2. `$XDG_CONFIG_HOME/folders/config.json` (user override)
/// 3. `~/.config/folders/config.json` (fallback XDG path)
/// 4. Embedded compile-time default from `defaults/config.json`
///
/// Any resolution step that fails falls through to the next.
pub fn default_config() -> Config {
    if let Ok(path) = std::env::var("FOLDERS_CONFIG") {
        match load_config(Path::new(&path)) {
            Ok(config) => return config,
            Err(e) => tracing::warn!("ignoring $FOLDERS_CONFIG: {e}"),
        }
    }

    if let Some(path) = xdg_config_path() {
        if path.exists() {
            match load_config(&path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("ignoring {}: {e}", path.display()),
            }
        }
    }

    embedded_default()
}

/// The compiled-in default configuration.
pub fn embedded_default() -> Config {
    parse_config(EMBEDDED_DEFAULT).expect("embedded default config is invalid JSON")
}

/// Parse a configuration from a JSON string.
pub fn parse_config(json: &str) -> Result<Config> {
    serde_json::from_str(json).map_err(|e| FoldersError::Config(format!("Failed to parse config: {e}")))
}

/// Load configuration from a file path.
pub fn load_config(path: &Path) -> Result<Config> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| FoldersError::Config(format!("Failed to read '{}': {e}", path.display())))?;
    parse_config(&json)
}

/// Return the XDG config path for folders.
fn xdg_config_path() -> Option<PathBuf> {
    let config_home = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })?;
    Some(config_home.join("folders/config.json"))
}

/// Return the embedded default configuration as a JSON string.
/// Useful for exporting/seeding user-customizable files.
pub fn embedded_default_json() -> &'static str {
    EMBEDDED_DEFAULT
}
