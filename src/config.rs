//! Settings loader
//!
//! Loads construction defaults from a YAML file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::BinErrorOption;

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "ROOTGRAPH_CONFIG";

/// Defaults applied by the [`Factory`](crate::Factory) to new objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// New histograms get a variance array immediately.
    pub default_sumw2: bool,
    /// New histograms include under/overflow cells in recomputed statistics.
    pub stat_overflows: bool,
    /// Error model of new histograms.
    pub bin_error_option: BinErrorOption,
    /// Prefix of auto-generated object names.
    pub dummy_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_sumw2: false,
            stat_overflows: false,
            bin_error_option: BinErrorOption::Normal,
            dummy_prefix: "dummy".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading settings from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(settings)
    }

    /// Load from `ROOTGRAPH_CONFIG` if set, else use the defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.default_sumw2);
        assert_eq!(settings.bin_error_option, BinErrorOption::Normal);
        assert_eq!(settings.dummy_prefix, "dummy");
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_sumw2: true\nbin_error_option: poisson2").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert!(settings.default_sumw2);
        assert!(!settings.stat_overflows);
        assert_eq!(settings.bin_error_option, BinErrorOption::Poisson2);
        assert_eq!(settings.dummy_prefix, "dummy");
    }

    #[test]
    fn test_from_env() {
        // the only test touching this variable
        std::env::remove_var(CONFIG_ENV);
        assert_eq!(Settings::from_env().unwrap(), Settings::default());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dummy_prefix: auto").unwrap();
        std::env::set_var(CONFIG_ENV, file.path());
        let settings = Settings::from_env();
        std::env::remove_var(CONFIG_ENV);
        assert_eq!(settings.unwrap().dummy_prefix, "auto");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load("/nonexistent/rootgraph.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
