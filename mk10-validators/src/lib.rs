// mk10-validators/src/lib.rs
// ============================================================================
// Module: MK10 Validators Library
// Description: Built-in format validators and the validator registry.
// Purpose: Resolve format tags to pure structural inspectors.
// Dependencies: mk10-core
// ============================================================================

//! ## Overview
//! Format validators are pure inspectors behind the uniform
//! [`mk10_core::FormatValidator`] contract: they read an artifact set, never
//! mutate it, never consult the wall clock, and reduce their findings to a
//! single pass/fail result with details. The registry routes validations by
//! format tag and enforces an allowlist/denylist access policy, failing
//! closed on anything denied or unregistered.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dcp;
pub mod registry;
pub mod structural;

#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dcp::DcpValidator;
pub use registry::ValidatorAccessPolicy;
pub use registry::ValidatorRegistry;
pub use structural::StructuralValidator;
