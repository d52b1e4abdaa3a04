//! OKG Configuration Management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for offline batch runs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::MatchMode;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Trait mapper configuration
    pub mapper: MapperConfig,

    /// Evaluation configuration
    pub evaluation: EvaluationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        EnvOverrides::from_env()?.apply(&mut config);
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Merge with environment variables (every variable that is set wins)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        EnvOverrides::from_env()?.apply(&mut self);
        Ok(self)
    }
}

/// Settings read from the environment; `None` when the variable is unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub lexicon_path: Option<PathBuf>,
    pub qualifier_window: Option<usize>,
    pub match_first_names: Option<bool>,
    pub match_mode: Option<MatchMode>,
    pub log_level: Option<String>,
    pub log_json: Option<bool>,
}

impl EnvOverrides {
    /// Read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let qualifier_window = match lookup("OKG_QUALIFIER_WINDOW") {
            Some(window) => Some(window.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "OKG_QUALIFIER_WINDOW".to_string(),
                value: window,
            })?),
            None => None,
        };

        Ok(Self {
            lexicon_path: lookup("OKG_LEXICON_PATH").map(PathBuf::from),
            qualifier_window,
            match_first_names: lookup("OKG_MATCH_FIRST_NAMES")
                .map(|flag| parse_bool("OKG_MATCH_FIRST_NAMES", &flag))
                .transpose()?,
            match_mode: lookup("OKG_MATCH_MODE")
                .map(|mode| mode.trim().parse())
                .transpose()?,
            log_level: lookup("LOG_LEVEL"),
            log_json: lookup("LOG_JSON")
                .map(|flag| parse_bool("LOG_JSON", &flag))
                .transpose()?,
        })
    }

    /// Overwrite every setting that is present
    pub fn apply(self, config: &mut AppConfig) {
        if let Some(path) = self.lexicon_path {
            config.mapper.lexicon_path = Some(path);
        }
        if let Some(window) = self.qualifier_window {
            config.mapper.qualifier_window = window;
        }
        if let Some(flag) = self.match_first_names {
            config.mapper.match_first_names = flag;
        }
        if let Some(mode) = self.match_mode {
            config.evaluation.mode = mode;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(flag) = self.log_json {
            config.logging.json_format = flag;
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Trait mapper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// TOML lexicon file; the built-in lexicon is used when unset
    pub lexicon_path: Option<PathBuf>,

    /// Words that invert the level of the following descriptor
    pub negation_markers: Vec<String>,

    /// Qualifiers shifting the level one step up
    pub intensifiers: Vec<String>,

    /// Qualifiers shifting the level one step down
    pub diminishers: Vec<String>,

    /// Maximum qualifier tokens considered before a descriptor
    pub qualifier_window: usize,

    /// Attribute paragraph text to persons by unique first name
    pub match_first_names: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            lexicon_path: None,
            negation_markers: words(&[
                "not", "never", "no", "hardly", "barely", "scarcely", "without", "isn't", "wasn't",
                "aren't", "weren't", "doesn't", "didn't", "don't", "nor",
            ]),
            intensifiers: words(&[
                "high",
                "highly",
                "very",
                "remarkable",
                "remarkably",
                "exceptional",
                "exceptionally",
                "particularly",
                "extremely",
                "incredibly",
                "strong",
                "strongly",
                "deeply",
                "truly",
            ]),
            diminishers: words(&[
                "low",
                "somewhat",
                "slightly",
                "mildly",
                "moderately",
                "occasionally",
                "rather",
                "fairly",
            ]),
            qualifier_window: 2,
            match_first_names: true,
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// Evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Interpretation used for the reference metric
    pub mode: MatchMode,

    /// Also compute the alternative interpretation
    pub include_retrieval: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::Exact,
            include_retrieval: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl From<ConfigError> for crate::OkgError {
    fn from(err: ConfigError) -> Self {
        crate::OkgError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.mapper.qualifier_window, 2);
        assert!(config.mapper.match_first_names);
        assert!(config.mapper.lexicon_path.is_none());
        assert_eq!(config.evaluation.mode, MatchMode::Exact);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_vocabulary() {
        let config = MapperConfig::default();
        assert!(config.negation_markers.contains(&"not".to_string()));
        assert!(config.intensifiers.contains(&"particularly".to_string()));
        assert!(config.diminishers.contains(&"somewhat".to_string()));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = AppConfig::from_toml_str(
            r#"
            [mapper]
            qualifier_window = 3

            [evaluation]
            mode = "retrieval"
            "#,
        )
        .unwrap();

        assert_eq!(config.mapper.qualifier_window, 3);
        assert_eq!(config.evaluation.mode, MatchMode::Retrieval);
        // Unset sections keep their defaults
        assert!(config.evaluation.include_retrieval);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file_missing() {
        let err = AppConfig::from_file("/nonexistent/okg.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError { .. }));
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: std::collections::HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_parse() {
        let overrides = EnvOverrides::from_lookup(lookup(&[
            ("OKG_LEXICON_PATH", "/etc/okg/lexicon.toml"),
            ("OKG_QUALIFIER_WINDOW", "4"),
            ("OKG_MATCH_FIRST_NAMES", "off"),
            ("OKG_MATCH_MODE", "Retrieval"),
            ("LOG_LEVEL", "debug"),
            ("LOG_JSON", "true"),
        ]))
        .unwrap();

        let mut config = AppConfig::default();
        overrides.apply(&mut config);

        assert_eq!(
            config.mapper.lexicon_path,
            Some(PathBuf::from("/etc/okg/lexicon.toml"))
        );
        assert_eq!(config.mapper.qualifier_window, 4);
        assert!(!config.mapper.match_first_names);
        assert_eq!(config.evaluation.mode, MatchMode::Retrieval);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_env_unset_leaves_config() {
        let overrides = EnvOverrides::from_lookup(lookup(&[])).unwrap();
        assert_eq!(overrides, EnvOverrides::default());

        let mut config = AppConfig::from_toml_str("[mapper]\nqualifier_window = 3").unwrap();
        overrides.apply(&mut config);
        assert_eq!(config.mapper.qualifier_window, 3);
    }

    #[test]
    fn test_env_invalid_values() {
        for (key, value) in [
            ("OKG_QUALIFIER_WINDOW", "two"),
            ("OKG_MATCH_MODE", "fuzzy"),
            ("OKG_MATCH_FIRST_NAMES", "maybe"),
            ("LOG_JSON", "sometimes"),
        ] {
            let err = EnvOverrides::from_lookup(lookup(&[(key, value)])).unwrap_err();
            match err {
                ConfigError::InvalidValue { key: k, value: v } => {
                    assert_eq!(k, key);
                    assert_eq!(v, value);
                }
                other => panic!("unexpected error for {key}: {other}"),
            }
        }
    }

    #[test]
    fn test_env_default_value_wins_over_file() {
        let mut config = AppConfig::from_toml_str(
            r#"
            [mapper]
            match_first_names = false

            [evaluation]
            mode = "retrieval"
            "#,
        )
        .unwrap();

        EnvOverrides::from_lookup(lookup(&[
            ("OKG_MATCH_FIRST_NAMES", "true"),
            ("OKG_MATCH_MODE", "exact"),
        ]))
        .unwrap()
        .apply(&mut config);

        assert!(config.mapper.match_first_names);
        assert_eq!(config.evaluation.mode, MatchMode::Exact);
    }

    // Only test touching the process environment
    #[test]
    fn test_from_env_and_override() {
        std::env::set_var("OKG_QUALIFIER_WINDOW", "5");
        std::env::set_var("OKG_MATCH_MODE", "exact");

        let from_env = AppConfig::from_env();
        let file = AppConfig::from_toml_str(
            r#"
            [mapper]
            qualifier_window = 1

            [evaluation]
            mode = "retrieval"
            "#,
        )
        .unwrap();
        let merged = file.with_env_override();

        std::env::remove_var("OKG_QUALIFIER_WINDOW");
        std::env::remove_var("OKG_MATCH_MODE");

        let from_env = from_env.unwrap();
        assert_eq!(from_env.mapper.qualifier_window, 5);
        assert_eq!(from_env.evaluation.mode, MatchMode::Exact);

        let merged = merged.unwrap();
        assert_eq!(merged.mapper.qualifier_window, 5);
        assert_eq!(merged.evaluation.mode, MatchMode::Exact);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "Yes").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }
}
