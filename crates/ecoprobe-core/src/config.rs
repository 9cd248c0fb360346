//! Engine configuration.
//!
//! Every field has a default, so an empty file (or no file) gives the
//! reference behaviour. Lookup order: explicit path, `./ecoprobe.toml`,
//! `<config dir>/ecoprobe/config.toml`.

use crate::code::ResourcePattern;
use crate::ecoindex::QuantileTable;
use crate::rules::RuleThresholds;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "ecoprobe.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub session: SessionConfig,
    pub code: CodeConfig,
    pub rules: RuleThresholds,
    pub ecoindex: QuantileTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minimum delay between two launches
    pub debounce_ms: u64,
    /// Scripts left out of code analysis (substring, or glob with `*`/`?`)
    pub excluded_scripts: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            excluded_scripts: vec!["script/analyseFrame.js".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    /// Average characters per line above which a resource is minified
    pub minified_line_length: f64,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            minified_line_length: 500.0,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `explicit` when given, otherwise from the first default
    /// location that exists, otherwise defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_locations().into_iter().find(|path| path.is_file()) {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.ecoindex.validate()?;

        if !(self.code.minified_line_length.is_finite() && self.code.minified_line_length > 0.0) {
            return Err(Error::InvalidConfig(
                "code.minified_line_length must be a positive number".to_string(),
            ));
        }

        let limits = &self.rules;
        for (name, percent) in [
            ("min_cached_percent", limits.min_cached_percent),
            ("min_etag_percent", limits.min_etag_percent),
            ("min_compressed_percent", limits.min_compressed_percent),
            ("min_minified_js_percent", limits.min_minified_js_percent),
            ("min_minified_css_percent", limits.min_minified_css_percent),
        ] {
            if !(0.0..=100.0).contains(&percent) {
                return Err(Error::InvalidConfig(format!(
                    "rules.{} must be between 0 and 100, got {}",
                    name, percent
                )));
            }
        }

        self.excluded_script_patterns().map(|_| ())
    }

    pub fn excluded_script_patterns(&self) -> Result<Vec<ResourcePattern>> {
        self.session
            .excluded_scripts
            .iter()
            .map(|pattern| ResourcePattern::parse(pattern))
            .collect()
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("ecoprobe").join("config.toml"));
    }
    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.session.debounce_ms, 1000);
        assert_eq!(config.code.minified_line_length, 500.0);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [session]
            debounce_ms = 250

            [rules]
            max_domains = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.session.debounce_ms, 250);
        assert_eq!(
            config.session.excluded_scripts,
            vec!["script/analyseFrame.js".to_string()]
        );
        assert_eq!(config.rules.max_domains, 4);
        assert_eq!(config.rules.max_http_requests, 26);
    }

    #[test]
    fn test_invalid_percent_rejected() {
        let err = EngineConfig::from_toml_str("[rules]\nmin_etag_percent = 150.0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_quantile_table_rejected() {
        let err = EngineConfig::from_toml_str("[ecoindex]\ndom = [10.0, 5.0]\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err =
            EngineConfig::from_toml_str("[session]\nexcluded_scripts = [\"[*\"]\n").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = EngineConfig::from_toml_str("[session\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[code]\nminified_line_length = 120.0").unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.code.minified_line_length, 120.0);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let err = EngineConfig::load(Some(Path::new("/nonexistent/ecoprobe.toml"))).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
