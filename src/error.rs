//! Error taxonomy and walk diagnostics.
//!
//! Wrapper-level failures are returned to the caller as [`BindError`].
//! Walk-level failures are collected as [`Diagnostic`] records so that one
//! bad binding or template never aborts sibling traversal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::ValueKind;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_INVALID_INPUT: &str = "B-ERR-WRAP-001";
pub const ERR_INITIALIZATION_FAILED: &str = "B-ERR-WRAP-002";
pub const ERR_TYPE_MISMATCH: &str = "B-ERR-WRAP-003";
pub const ERR_UNKNOWN_FIELD: &str = "B-ERR-WRAP-004";
pub const ERR_UNRESOLVED_BINDING: &str = "B-ERR-BIND-001";
pub const ERR_UNRESOLVED_HANDLER: &str = "B-ERR-BIND-002";
pub const ERR_MISSING_TEMPLATE: &str = "B-ERR-TPL-001";
pub const ERR_UNKNOWN_COMPONENT: &str = "B-ERR-TPL-002";
pub const ERR_RECURSION_LIMIT: &str = "B-ERR-TPL-003";
pub const ERR_PARSE: &str = "B-ERR-PARSE-001";
pub const ERR_CONFIG: &str = "B-ERR-CONFIG-001";

pub type BindResult<T> = Result<T, BindError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("invalid component definition '{kind}': {reason}")]
    InvalidInput { kind: String, reason: String },

    #[error("could not initialize component '{kind}': {reason}")]
    InitializationFailed { kind: String, reason: String },

    #[error("field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("component '{kind}' has no field '{field}'")]
    UnknownField { kind: String, field: String },

    #[error("binding '{name}' for attribute '{key}' is not defined in scope")]
    UnresolvedBinding { key: String, name: String },

    #[error("handler '{name}' for event '{key}' is not defined in scope")]
    UnresolvedHandler { key: String, name: String },

    #[error("template '{template_id}' for component '{kind}' is not registered")]
    MissingTemplate { kind: String, template_id: String },

    #[error("component '{kind}' is not registered")]
    UnknownComponent { kind: String },

    #[error("component '{kind}' nests deeper than {limit} levels")]
    RecursionLimit { kind: String, limit: usize },

    #[error("parse error in '{source_id}': {message}")]
    Parse { source_id: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BindError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => ERR_INVALID_INPUT,
            Self::InitializationFailed { .. } => ERR_INITIALIZATION_FAILED,
            Self::TypeMismatch { .. } => ERR_TYPE_MISMATCH,
            Self::UnknownField { .. } => ERR_UNKNOWN_FIELD,
            Self::UnresolvedBinding { .. } => ERR_UNRESOLVED_BINDING,
            Self::UnresolvedHandler { .. } => ERR_UNRESOLVED_HANDLER,
            Self::MissingTemplate { .. } => ERR_MISSING_TEMPLATE,
            Self::UnknownComponent { .. } => ERR_UNKNOWN_COMPONENT,
            Self::RecursionLimit { .. } => ERR_RECURSION_LIMIT,
            Self::Parse { .. } => ERR_PARSE,
            Self::Config(_) => ERR_CONFIG,
        }
    }

    /// Recoverable errors leave a degraded but usable tree behind.
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnresolvedBinding { .. } | Self::Parse { .. } | Self::TypeMismatch { .. } => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One entry of a walk's error list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    /// Tag of the markup node being walked when the problem was found.
    pub tag: Option<String>,
}

impl Diagnostic {
    pub fn new(error: &BindError, tag: Option<&str>) -> Self {
        Diagnostic {
            code: error.code().to_string(),
            severity: error.severity(),
            message: error.to_string(),
            tag: tag.map(|t| t.to_string()),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "[{}] <{}> {}", self.code, tag, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}
