use crate::error::{Error, Result};
use crate::ingredients::substitution::SubstitutionRule;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// Reference data shipped with the binary, used when no file is configured
const BUILTIN_REFERENCE: &str = include_str!("../../config/reference.yaml");

/// Static ingredient reference data: normalization tables, staples, substitutions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceData {
    pub version: u32,
    #[serde(default)]
    pub pantry_staples: Vec<String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub units: Vec<String>,
    #[serde(default)]
    pub descriptors: Vec<String>,
    #[serde(default)]
    pub invariant_plurals: Vec<String>,
    #[serde(default)]
    pub substitutions: Vec<SubstitutionRule>,
}

impl ReferenceData {
    /// Load reference data from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read reference data from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml(&content).map_err(|e| {
            Error::Config(format!(
                "Invalid reference data in {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Parse and validate reference data from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let data: ReferenceData = serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse reference data: {e}")))?;

        data.validate()?;
        Ok(data)
    }

    /// The reference data compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_REFERENCE)
    }

    /// Load from `path` when it exists, otherwise fall back to the built-in tables
    ///
    /// A file that exists but fails to parse or validate is an error.
    pub fn load_or_builtin<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let data = Self::from_file(path)?;
            tracing::info!(
                "Loaded reference data from {}: {} aliases, {} substitutions",
                path.display(),
                data.aliases.len(),
                data.rule_count()
            );
            Ok(data)
        } else {
            tracing::warn!(
                "Reference data file {} not found, using built-in tables",
                path.display()
            );
            Self::builtin()
        }
    }

    /// Validate the entire reference data set
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(Error::Config(format!(
                "Unsupported reference data version: {}. Expected version 1",
                self.version
            )));
        }

        for (from, to) in &self.aliases {
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Alias entries cannot be empty: '{from}' -> '{to}'"
                )));
            }
        }

        if self.pantry_staples.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::Config("Pantry staples cannot be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for (index, rule) in self.substitutions.iter().enumerate() {
            Self::validate_rule(rule).map_err(|e| {
                Error::Config(format!("Substitution #{} ({}): {}", index + 1, rule.ingredient, e))
            })?;

            let key = (
                rule.ingredient.trim().to_lowercase(),
                rule.substitute.trim().to_lowercase(),
            );
            if !seen.insert(key) {
                return Err(Error::Config(format!(
                    "Duplicate substitution: {} -> {}",
                    rule.ingredient, rule.substitute
                )));
            }
        }

        Ok(())
    }

    /// Validate a single substitution rule
    fn validate_rule(rule: &SubstitutionRule) -> Result<()> {
        if rule.ingredient.trim().is_empty() {
            return Err(Error::Config("Ingredient cannot be empty".to_string()));
        }

        if rule.substitute.trim().is_empty() {
            return Err(Error::Config("Substitute cannot be empty".to_string()));
        }

        if rule.ingredient.trim().eq_ignore_ascii_case(rule.substitute.trim()) {
            return Err(Error::Config(
                "An ingredient cannot substitute for itself".to_string(),
            ));
        }

        if rule.confidence > 100 {
            return Err(Error::Config(format!(
                "Confidence must be between 0 and 100, got {}",
                rule.confidence
            )));
        }

        Ok(())
    }

    /// Number of substitution rules
    pub fn rule_count(&self) -> usize {
        self.substitutions.len()
    }
}
