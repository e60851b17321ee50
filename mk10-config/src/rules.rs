// mk10-config/src/rules.rs
// ============================================================================
// Module: MK10 Rule File Loader
// Description: Declarative policy rule files with enumerated predicates only.
// Purpose: Load immutable rule sets and reject anything outside the fixed set.
// Dependencies: mk10-core, serde, toml
// ============================================================================

//! ## Overview
//! Rule files are declarative TOML naming rules by id and predicate kind.
//! The predicate vocabulary is closed: a file naming an unknown predicate is
//! rejected with the offending rule id. Parameters are carried through
//! verbatim into the canonical evidence subset. Once loaded, the rule set is
//! immutable; the loader exposes no mutation path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use mk10_core::PolicyRule;
use mk10_core::PredicateKind;
use mk10_core::RuleId;
use mk10_core::RuleSet;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading rule files.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Reading the file failed.
    #[error("rule file io error at {path}: {message}")]
    Io {
        /// Path that failed.
        path: String,
        /// Error message.
        message: String,
    },
    /// Parsing the TOML failed.
    #[error("rule file parse error: {0}")]
    Parse(String),
    /// A rule names a predicate outside the fixed set.
    #[error("unknown rule predicate {predicate} in rule {id}")]
    UnknownRule {
        /// Offending rule id.
        id: String,
        /// Predicate name found.
        predicate: String,
    },
    /// A rule id appears more than once.
    #[error("duplicate rule id {0}")]
    DuplicateRule(String),
    /// A rule parameter cannot be represented in the evidence subset.
    #[error("invalid parameter in rule {id}: {message}")]
    InvalidParameter {
        /// Offending rule id.
        id: String,
        /// Description of the problem.
        message: String,
    },
}

// ============================================================================
// SECTION: File Model
// ============================================================================

/// Raw rule file shape.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    /// Declared rules.
    #[serde(default)]
    rules: Vec<RuleEntry>,
}

/// Raw rule entry shape.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleEntry {
    /// Rule identifier.
    id: String,
    /// Predicate name; must be one of the fixed set.
    predicate: String,
    /// Optional predicate parameters.
    #[serde(default)]
    parameters: BTreeMap<String, toml::Value>,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads a rule file from disk.
///
/// # Errors
///
/// Returns [`RuleError`] when the file cannot be read or parsed, names an
/// unknown predicate, or repeats a rule id.
pub fn load_rules(path: &Path) -> Result<RuleSet, RuleError> {
    let text = fs::read_to_string(path).map_err(|err| RuleError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    parse_rules(&text)
}

/// Parses rule-file text into an immutable rule set.
///
/// # Errors
///
/// Returns [`RuleError`] as for [`load_rules`].
pub fn parse_rules(text: &str) -> Result<RuleSet, RuleError> {
    let file: RuleFile = toml::from_str(text).map_err(|err| RuleError::Parse(err.to_string()))?;
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut rules = Vec::with_capacity(file.rules.len());
    for entry in file.rules {
        if !seen.insert(entry.id.clone()) {
            return Err(RuleError::DuplicateRule(entry.id));
        }
        let predicate_kind = parse_predicate(&entry.id, &entry.predicate)?;
        let mut parameters = BTreeMap::new();
        for (key, value) in entry.parameters {
            parameters.insert(key, toml_to_evidence_value(&entry.id, value)?);
        }
        rules.push(PolicyRule {
            id: RuleId::new(entry.id),
            predicate_kind,
            parameters,
        });
    }
    Ok(RuleSet::new(rules))
}

/// Maps a predicate name onto the fixed kind set.
fn parse_predicate(id: &str, predicate: &str) -> Result<PredicateKind, RuleError> {
    match predicate {
        "determinism_required" => Ok(PredicateKind::DeterminismRequired),
        "evidence_required" => Ok(PredicateKind::EvidenceRequired),
        "lineage_required" => Ok(PredicateKind::LineageRequired),
        "validation_required" => Ok(PredicateKind::ValidationRequired),
        "immutability_required" => Ok(PredicateKind::ImmutabilityRequired),
        "playability_required" => Ok(PredicateKind::PlayabilityRequired),
        other => Err(RuleError::UnknownRule {
            id: id.to_string(),
            predicate: other.to_string(),
        }),
    }
}

/// Converts a TOML parameter value into the canonical evidence subset.
/// Floats and datetimes have no canonical evidence form and are rejected.
fn toml_to_evidence_value(id: &str, value: toml::Value) -> Result<Value, RuleError> {
    match value {
        toml::Value::String(text) => Ok(Value::String(text)),
        toml::Value::Integer(number) => Ok(Value::from(number)),
        toml::Value::Boolean(flag) => Ok(Value::Bool(flag)),
        toml::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(toml_to_evidence_value(id, item)?);
            }
            Ok(Value::Array(out))
        }
        toml::Value::Table(table) => {
            let mut out = serde_json::Map::new();
            for (key, item) in table {
                out.insert(key, toml_to_evidence_value(id, item)?);
            }
            Ok(Value::Object(out))
        }
        toml::Value::Float(_) => Err(RuleError::InvalidParameter {
            id: id.to_string(),
            message: "floats are not permitted in rule parameters".to_string(),
        }),
        toml::Value::Datetime(_) => Err(RuleError::InvalidParameter {
            id: id.to_string(),
            message: "datetimes are not permitted in rule parameters".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_rule_file_parses() {
        let rules = parse_rules(
            r#"
[[rules]]
id = "determinism.audit"
predicate = "determinism_required"

[[rules]]
id = "validation.dcp"
predicate = "validation_required"
parameters = { formats = ["DCP"] }
"#,
        )
        .expect("parse");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.rules()[1].parameters["formats"], serde_json::json!(["DCP"]));
    }

    #[test]
    fn unknown_predicate_is_rejected_with_rule_id() {
        let err = parse_rules(
            "[[rules]]\nid = \"bad\"\npredicate = \"vibes_required\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::UnknownRule { id, .. } if id == "bad"));
    }

    #[test]
    fn duplicate_rule_ids_are_rejected() {
        let err = parse_rules(
            "[[rules]]\nid = \"r\"\npredicate = \"evidence_required\"\n\n[[rules]]\nid = \"r\"\npredicate = \"lineage_required\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::DuplicateRule(id) if id == "r"));
    }

    #[test]
    fn float_parameters_are_rejected() {
        let err = parse_rules(
            "[[rules]]\nid = \"r\"\npredicate = \"evidence_required\"\nparameters = { threshold = 0.5 }\n",
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::InvalidParameter { .. }));
    }
}
