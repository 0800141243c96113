//! Serializable matcher configuration.
//!
//! ```rust
//! use candlewiz::MatcherConfig;
//!
//! let config = MatcherConfig::from_json(r#"{
//!     "span": 6,
//!     "patterns": [
//!         { "name": "Long Green", "bias": 1, "clauses": ["(+1, 0, >90, 0, 0)"] }
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(config.span.get(), 6);
//! assert!(config.default_catalog);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Direction, PatternError, Period, Result, DEFAULT_SPAN};

/// Source form of one pattern: name, expected bias and clause texts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub name: String,
    /// -1, 0 or +1
    pub bias: Direction,
    pub clauses: Vec<String>,
}

impl PatternSpec {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        bias: Direction,
        clauses: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            bias,
            clauses: clauses.into_iter().map(Into::into).collect(),
        }
    }
}

/// Settings consumed by [`MatcherBuilder::from_config`](crate::MatcherBuilder::from_config)
/// and [`scan_parallel`](crate::scan_parallel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub span: Period,
    pub validate_data: bool,
    /// Prepend the built-in patterns to `patterns`
    pub default_catalog: bool,
    pub patterns: Vec<PatternSpec>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            span: Period::new_const(DEFAULT_SPAN),
            validate_data: false,
            default_catalog: true,
            patterns: Vec::new(),
        }
    }
}

impl MatcherConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PatternError::InvalidConfig(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("loading matcher config from {}", path.display());
        let json = std::fs::read_to_string(path).map_err(|e| {
            PatternError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PatternError::InvalidConfig(e.to_string()))
    }

    /// Structural checks that do not need compiling the clauses
    pub fn validate(&self) -> Result<()> {
        for spec in &self.patterns {
            if spec.name.trim().is_empty() {
                return Err(PatternError::InvalidConfig(
                    "pattern name must not be empty".to_string(),
                ));
            }
            if spec.clauses.is_empty() {
                return Err(PatternError::EmptyPattern {
                    pattern: spec.name.clone(),
                });
            }
        }
        if !self.default_catalog && self.patterns.is_empty() {
            log::warn!("matcher config has no patterns; every report will be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatcherConfig::from_json("{}").unwrap();
        assert_eq!(config, MatcherConfig::default());
        assert_eq!(config.span.get(), 5);
        assert!(!config.validate_data);
        assert!(config.default_catalog);
    }

    #[test]
    fn test_pattern_specs() {
        let config = MatcherConfig::from_json(
            r#"{
                "default_catalog": false,
                "validate_data": true,
                "patterns": [
                    { "name": "Up", "bias": 1, "clauses": ["(+1, 0, 0, 0, 0)"] },
                    { "name": "Flat", "bias": 0, "clauses": ["(0), (0,0,0,0)"] }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.patterns.len(), 2);
        assert_eq!(config.patterns[0].bias, Direction::Bullish);
        assert_eq!(config.patterns[1].bias, Direction::Neutral);
        assert!(config.validate_data);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            MatcherConfig::from_json(r#"{ "span": 0 }"#),
            Err(PatternError::InvalidConfig(_))
        ));
        assert!(matches!(
            MatcherConfig::from_json(r#"{ "patterns": [{ "name": "X", "bias": 3, "clauses": ["(0,0,0,0)"] }] }"#),
            Err(PatternError::InvalidConfig(_))
        ));
        assert!(matches!(
            MatcherConfig::from_json(r#"{ "patterns": [{ "name": "X", "bias": 0, "clauses": [] }] }"#),
            Err(PatternError::EmptyPattern { .. })
        ));
        assert!(matches!(
            MatcherConfig::from_json(r#"{ "patterns": [{ "name": " ", "bias": 0, "clauses": ["(0,0,0,0)"] }] }"#),
            Err(PatternError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_json_output_reloads() {
        let mut config = MatcherConfig::default();
        config.patterns.push(PatternSpec::new(
            "Down",
            Direction::Bearish,
            ["(-1, 0, >=70, 0, 0)"],
        ));
        let json = config.to_json().unwrap();
        assert!(json.contains("\"bias\": -1"));
        assert_eq!(MatcherConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            MatcherConfig::from_file("/nonexistent/candlewiz.json"),
            Err(PatternError::InvalidConfig(_))
        ));
    }
}
