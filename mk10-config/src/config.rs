// mk10-config/src/config.rs
// ============================================================================
// Module: MK10 Configuration Model
// Description: Strict TOML configuration for workspaces and tooling.
// Purpose: Fail-closed validation of mk10.toml with path-qualified errors.
// Dependencies: mk10-core, serde, toml
// ============================================================================

//! ## Overview
//! The configuration file points the tooling at a workspace, a hash
//! algorithm, a rule file, and a validator access policy. Unknown fields are
//! rejected. Nothing in the configuration can alter rule semantics, inject
//! wall-clock time, or weaken a policy gate: the file locates inputs, it
//! never redefines them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use mk10_core::HashAlgorithm;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a configuration file.
const MAX_CONFIG_BYTES: u64 = 256 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the file failed.
    #[error("config io error at {path}: {message}")]
    Io {
        /// Path that failed.
        path: String,
        /// Error message.
        message: String,
    },
    /// The file exceeds the size limit.
    #[error("config file {path} exceeds {limit} bytes")]
    TooLarge {
        /// Path that failed.
        path: String,
        /// Size limit in bytes.
        limit: u64,
    },
    /// Parsing the TOML failed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A field failed validation.
    #[error("invalid config at {path}: {message}")]
    Invalid {
        /// Dotted path of the offending field.
        path: String,
        /// Description of the problem.
        message: String,
    },
}

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Root configuration for MK10-PRO tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mk10Config {
    /// Workspace settings.
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    /// Hashing settings.
    #[serde(default)]
    pub hashing: HashingConfig,
    /// Policy settings.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Validator access settings.
    #[serde(default)]
    pub validators: ValidatorsConfig,
}

/// Workspace settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Workspace identifier used for execution ids.
    pub id: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
        }
    }
}

/// Hashing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashingConfig {
    /// Hash algorithm for canonical digests.
    #[serde(default = "default_algorithm")]
    pub algorithm: HashAlgorithm,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
        }
    }
}

/// Default hash algorithm.
const fn default_algorithm() -> HashAlgorithm {
    HashAlgorithm::Sha256
}

/// Policy settings. Only the rule-file location is configurable; rule
/// semantics live in the core and cannot be inlined here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Path to the declarative rule file.
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
}

/// Validator access settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorsConfig {
    /// Optional allowlist of format tags.
    #[serde(default)]
    pub allow: Option<Vec<String>>,
    /// Denylist of format tags.
    #[serde(default)]
    pub deny: Vec<String>,
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

impl Mk10Config {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let metadata = fs::metadata(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        if metadata.len() > MAX_CONFIG_BYTES {
            return Err(ConfigError::TooLarge {
                path: path.display().to_string(),
                limit: MAX_CONFIG_BYTES,
            });
        }
        let text = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::parse(&text)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates field-level constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] with the dotted field path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace.id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                path: "workspace.id".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if let Some(allow) = &self.validators.allow {
            for (idx, tag) in allow.iter().enumerate() {
                if tag.trim().is_empty() {
                    return Err(ConfigError::Invalid {
                        path: format!("validators.allow[{idx}]"),
                        message: "must not be empty".to_string(),
                    });
                }
            }
        }
        for (idx, tag) in self.validators.deny.iter().enumerate() {
            if tag.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    path: format!("validators.deny[{idx}]"),
                    message: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Mk10Config::default().validate().expect("valid");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Mk10Config::parse("[workspace]\nid = \"ws\"\nmystery = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn empty_workspace_id_is_invalid() {
        let err = Mk10Config::parse("[workspace]\nid = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { path, .. } if path == "workspace.id"));
    }

    #[test]
    fn full_config_parses() {
        let config = Mk10Config::parse(
            "[workspace]\nid = \"studio-a\"\n\n[hashing]\nalgorithm = \"sha512\"\n\n[policy]\nrules_file = \"rules.toml\"\n\n[validators]\nallow = [\"DCP\"]\ndeny = [\"LEGACY\"]\n",
        )
        .expect("parse");
        assert_eq!(config.workspace.id, "studio-a");
        assert_eq!(config.hashing.algorithm, HashAlgorithm::Sha512);
        assert_eq!(config.policy.rules_file.as_deref(), Some(Path::new("rules.toml")));
    }
}
