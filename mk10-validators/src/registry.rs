// mk10-validators/src/registry.rs
// ============================================================================
// Module: Validator Registry
// Description: Registry for built-in and external format validators.
// Purpose: Route validations by format tag with access-policy checks.
// Dependencies: mk10-core
// ============================================================================

//! ## Overview
//! The validator registry resolves format tags to validator implementations
//! and enforces allowlist and denylist policies. A denied or unregistered
//! tag fails closed: the caller gets an error, never a silent pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use mk10_core::FormatTag;
use mk10_core::FormatValidator;
use mk10_core::ValidationError;
use mk10_core::ValidationResult;
use mk10_core::ValidationTarget;

use crate::DcpValidator;
use crate::StructuralValidator;

// ============================================================================
// SECTION: Access Policy
// ============================================================================

/// Access policy controlling which format tags may be validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorAccessPolicy {
    /// Optional allowlist of format tags.
    pub allowlist: Option<BTreeSet<String>>,
    /// Explicit denylist of format tags.
    pub denylist: BTreeSet<String>,
}

impl ValidatorAccessPolicy {
    /// Returns a policy that permits all formats.
    #[must_use]
    pub const fn allow_all() -> Self {
        Self {
            allowlist: None,
            denylist: BTreeSet::new(),
        }
    }

    /// Returns true when the format tag is allowed by policy.
    #[must_use]
    pub fn is_allowed(&self, format: &str) -> bool {
        if self.denylist.contains(format) {
            return false;
        }
        if let Some(allowlist) = &self.allowlist {
            return allowlist.contains(format);
        }
        true
    }
}

impl Default for ValidatorAccessPolicy {
    fn default() -> Self {
        Self::allow_all()
    }
}

// ============================================================================
// SECTION: Validator Registry
// ============================================================================

/// Format validator registry with policy enforcement.
pub struct ValidatorRegistry {
    /// Validator implementations keyed by format tag.
    validators: BTreeMap<String, Box<dyn FormatValidator + Send + Sync>>,
    /// Access control policy for validator usage.
    policy: ValidatorAccessPolicy,
}

impl ValidatorRegistry {
    /// Creates a new registry with the provided policy.
    #[must_use]
    pub fn new(policy: ValidatorAccessPolicy) -> Self {
        Self {
            validators: BTreeMap::new(),
            policy,
        }
    }

    /// Creates a registry with the built-in validators registered.
    #[must_use]
    pub fn with_builtin_validators() -> Self {
        let mut registry = Self::new(ValidatorAccessPolicy::default());
        registry.register_validator(DcpValidator::new());
        registry.register_validator(StructuralValidator::new("structural"));
        registry
    }

    /// Registers a validator under its own format tag.
    pub fn register_validator(
        &mut self,
        validator: impl FormatValidator + Send + Sync + 'static,
    ) {
        self.validators.insert(validator.format().as_str().to_string(), Box::new(validator));
    }

    /// Returns the registered format tags in sorted order.
    #[must_use]
    pub fn formats(&self) -> Vec<&str> {
        self.validators.keys().map(String::as_str).collect()
    }

    /// Validates the artifact set against one format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Provider`] when the tag is denied by policy
    /// or has no registered validator, or when the validator itself fails.
    pub fn validate(
        &self,
        format: &FormatTag,
        target: &ValidationTarget<'_>,
    ) -> Result<ValidationResult, ValidationError> {
        if !self.policy.is_allowed(format.as_str()) {
            return Err(ValidationError::Provider {
                format: format.clone(),
                message: "format blocked by access policy".to_string(),
            });
        }
        let validator =
            self.validators.get(format.as_str()).ok_or_else(|| ValidationError::Provider {
                format: format.clone(),
                message: "no validator registered for format".to_string(),
            })?;
        validator.validate(target)
    }

    /// Validates the artifact set against every declared format, in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered; individual failed
    /// validations are results, not errors.
    pub fn validate_declared(
        &self,
        formats: &[FormatTag],
        target: &ValidationTarget<'_>,
    ) -> Result<Vec<ValidationResult>, ValidationError> {
        let mut results = Vec::with_capacity(formats.len());
        for format in formats {
            results.push(self.validate(format, target)?);
        }
        Ok(results)
    }
}
