// mk10-config/src/lib.rs
// ============================================================================
// Module: MK10 Config Library
// Description: Canonical config model, validation, and rule-file loading.
// Purpose: Single source of truth for mk10.toml and rule-file semantics.
// Dependencies: mk10-core, serde, toml
// ============================================================================

//! ## Overview
//! `mk10-config` defines the canonical configuration model for MK10-PRO with
//! strict, fail-closed validation, and loads declarative policy rule files.
//! Configuration carries only the *location* of the rule file; rule semantics
//! are fixed in the core and nothing here can override them. Unknown
//! predicates are rejected at load time.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod rules;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::HashingConfig;
pub use config::Mk10Config;
pub use config::PolicyConfig;
pub use config::ValidatorsConfig;
pub use config::WorkspaceConfig;
pub use rules::RuleError;
pub use rules::load_rules;
pub use rules::parse_rules;
