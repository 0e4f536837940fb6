use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants;
use crate::context::{LoaderConfig, ScoreWeights, SummarizerConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Character budgets for the assembled document
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Relevance scoring weights
    #[serde(default)]
    pub weights: ScoreWeights,

    /// Per-file summarization tuning
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Project file enumeration settings
    #[serde(default)]
    pub loader: LoaderConfig,
}

/// Character budgets governing the assembled context document.
///
/// Every option is independently tunable; `max_total_len` is the hard
/// ceiling the final document never exceeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Hard ceiling for the whole document
    pub max_total_len: usize,
    /// Ceiling for a single file body
    pub max_file_len: usize,
    /// Symbol entries listed per file in the symbol index
    pub max_symbols_per_file: usize,
    /// Ceiling for the whole symbol index section
    pub max_symbol_section_len: usize,
    /// Ceiling for the active-symbol detail section
    pub max_active_symbol_len: usize,
    /// Imports shown per file before "…and N more"
    pub max_displayed_imports: usize,
    /// Paths shown per listing section before "…and N more"
    pub max_displayed_paths: usize,
    /// Maximum number of ranked files considered for packing
    pub max_files: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_total_len: constants::DEFAULT_MAX_TOTAL_LEN,
            max_file_len: constants::DEFAULT_MAX_FILE_LEN,
            max_symbols_per_file: constants::DEFAULT_MAX_SYMBOLS_PER_FILE,
            max_symbol_section_len: constants::DEFAULT_MAX_SYMBOL_SECTION_LEN,
            max_active_symbol_len: constants::DEFAULT_MAX_ACTIVE_SYMBOL_LEN,
            max_displayed_imports: constants::DEFAULT_MAX_DISPLAYED_IMPORTS,
            max_displayed_paths: constants::DEFAULT_MAX_DISPLAYED_PATHS,
            max_files: constants::DEFAULT_MAX_FILES,
        }
    }
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<AppConfig> {
    // Get config directories
    let config_dir = get_config_dir()?;
    let global_config = config_dir.join("config.toml");
    let local_config = PathBuf::from("contexture.toml");

    // Build figment configuration
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    // Add global config if it exists
    if global_config.exists() {
        figment = figment.merge(Toml::file(&global_config));
    }

    // Add local config if it exists
    if local_config.exists() {
        figment = figment.merge(Toml::file(&local_config));
    }

    // Add environment variables (CONTEXTURE_ prefix)
    figment = figment.merge(Env::prefixed("CONTEXTURE_").split("__"));

    // Extract and return config
    figment.extract().context("Failed to load configuration")
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "contexture") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        // Fallback to home directory
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("contexture");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_self_consistent() {
        let config = AppConfig::default();
        assert!(config.budget.max_file_len <= config.budget.max_total_len);
        assert!(config.budget.max_files > 0);
        assert_eq!(
            config.budget.max_total_len,
            constants::DEFAULT_MAX_TOTAL_LEN
        );
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = AppConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.budget.max_total_len, config.budget.max_total_len);
        assert_eq!(parsed.weights.active_file, config.weights.active_file);
    }
}
