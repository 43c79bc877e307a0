//! Error types for ACE operations
//!
//! Resolution follows an all-or-nothing contract: callers see either a fully
//! resolved registry or a single descriptive failure for the whole pass.
//! The error surface reflects that split:
//! - Fatal errors abort the pass (`is_fatal() == true`)
//! - Condition-evaluation errors never abort the pass; the resolver treats
//!   the condition as not met and records why
//!
//! Each variant has a stable error code (e.g. `CYCLIC_DEPENDENCY`) for
//! logging, aggregation, and client-side handling, and a category for
//! grouping.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for ACE operations
pub type Result<T> = std::result::Result<T, AceError>;

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The descriptor set itself is invalid
    Configuration,
    /// Descriptor dependency structure is unsatisfiable
    Dependency,
    /// A component's build step failed
    Construction,
    /// A condition could not be evaluated
    Evaluation,
    /// A requested capability is not present
    NotFound,
}

/// Errors that can occur while building or resolving a component catalog
#[derive(Error, Debug)]
pub enum AceError {
    /// Catalog validation failed before the pass started
    #[error("Invalid catalog: {reason}. Fix the descriptor set before resolving.")]
    InvalidCatalog { reason: String },

    /// A descriptor id was registered twice
    #[error("Duplicate descriptor id: '{descriptor_id}'. Descriptor ids must be unique within a catalog.")]
    DuplicateDescriptor { descriptor_id: String },

    /// Descriptor dependencies form a cycle; nothing was constructed
    #[error("Cyclic dependency among descriptors: {}. Break the cycle before resolving.", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// Two descriptors unconditionally claimed an exclusive capability
    #[error("Capability '{capability}' already has an active instance from '{first}', but '{second}' also claims it exclusively.")]
    CardinalityViolation {
        capability: String,
        first: String,
        second: String,
    },

    /// A component constructor failed; the whole pass is aborted
    #[error("Constructor for '{descriptor_id}' failed: {reason}")]
    ConstructorError {
        descriptor_id: String,
        reason: String,
    },

    /// A condition could not be evaluated (e.g. empty key reference).
    /// Never fatal: the resolver logs it and treats the condition as false.
    #[error("Condition could not be evaluated: {detail}")]
    ConditionEvaluation { detail: String },

    /// A capability was required from the registry but is not present
    #[error("Capability not present: '{capability}'. Use get() to observe absence without an error.")]
    CapabilityNotFound { capability: String },
}

impl AceError {
    /// Returns true if this error aborts a resolution pass
    ///
    /// Condition-evaluation errors fail closed (condition treated as not
    /// met) and capability lookups report absence; neither aborts a pass.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AceError::ConditionEvaluation { .. } | AceError::CapabilityNotFound { .. }
        )
    }

    /// Returns the error category for grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            AceError::InvalidCatalog { .. }
            | AceError::DuplicateDescriptor { .. }
            | AceError::CardinalityViolation { .. } => ErrorCategory::Configuration,

            AceError::CyclicDependency { .. } => ErrorCategory::Dependency,

            AceError::ConstructorError { .. } => ErrorCategory::Construction,

            AceError::ConditionEvaluation { .. } => ErrorCategory::Evaluation,

            AceError::CapabilityNotFound { .. } => ErrorCategory::NotFound,
        }
    }

    /// Returns the stable error code for this error
    ///
    /// Error codes are uppercase, underscore-separated identifiers that
    /// remain stable across versions.
    pub fn error_code(&self) -> &'static str {
        match self {
            AceError::InvalidCatalog { .. } => "INVALID_CATALOG",
            AceError::DuplicateDescriptor { .. } => "DUPLICATE_DESCRIPTOR",
            AceError::CyclicDependency { .. } => "CYCLIC_DEPENDENCY",
            AceError::CardinalityViolation { .. } => "CARDINALITY_VIOLATION",
            AceError::ConstructorError { .. } => "CONSTRUCTOR_ERROR",
            AceError::ConditionEvaluation { .. } => "CONDITION_EVALUATION",
            AceError::CapabilityNotFound { .. } => "CAPABILITY_NOT_FOUND",
        }
    }
}
