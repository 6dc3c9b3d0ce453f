//! Error taxonomy for loading directives and resolving queries.

use thiserror::Error;

use crate::field::Family;

/// A user-supplied value failed its field's validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct FieldValidationError {
    /// Name of the failing field.
    pub field: String,
    /// Human-readable reason, safe to show to the end user.
    pub reason: String,
}

impl FieldValidationError {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Structural problems found while building a registry.
///
/// Any of these refuses the whole load: a registry is installed complete or not at all.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("directive {name:?} has an empty id")]
    EmptyId { name: String },

    #[error("duplicate directive id: {id}")]
    DuplicateId { id: String },

    #[error("directive {directive} has no platforms")]
    NoPlatforms { directive: String },

    #[error("directive {directive} has no fields")]
    NoFields { directive: String },

    #[error("directive {directive}: duplicate field name {field}")]
    DuplicateField { directive: String, field: String },

    #[error("directive {directive}, field {field}: {reason}")]
    InvalidField {
        directive: String,
        field: String,
        reason: String,
    },

    #[error("directive {directive}, rule {index}: {reason}")]
    InvalidRule {
        directive: String,
        index: usize,
        reason: String,
    },

    #[error("directive {directive}, rule {index}: template {template:?}: {reason}")]
    InvalidTemplate {
        directive: String,
        index: usize,
        template: String,
        reason: String,
    },

    #[error("catalog {name}: {source}")]
    Catalog {
        name: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Why a query could not be turned into commands.
///
/// Every variant is a recoverable, caller-facing outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("directive not found: {id}")]
    DirectiveNotFound { id: String },

    #[error("directive {directive} is not available on platform {platform}")]
    PlatformMismatch { directive: String, platform: String },

    #[error(transparent)]
    FieldValidation(#[from] FieldValidationError),

    #[error("query denied by directive {directive} (rule {rule})")]
    QueryDenied { directive: String, rule: usize },

    #[error("no rule of directive {directive} applies to {target}")]
    NoApplicableRule { directive: String, target: String },

    #[error("no {family} source address is configured")]
    MissingSource { family: Family },

    #[error("{placeholder} cannot be used for target {target}")]
    SourceFamilyMismatch { placeholder: String, target: String },
}

impl ResolutionError {
    /// Stable machine-readable kind, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::DirectiveNotFound { .. } => "directive_not_found",
            ResolutionError::PlatformMismatch { .. } => "platform_mismatch",
            ResolutionError::FieldValidation(_) => "field_validation",
            ResolutionError::QueryDenied { .. } => "query_denied",
            ResolutionError::NoApplicableRule { .. } => "no_applicable_rule",
            ResolutionError::MissingSource { .. } => "missing_source",
            ResolutionError::SourceFamilyMismatch { .. } => "source_family_mismatch",
        }
    }

    /// Whether the caller asked for something that does not exist, as opposed
    /// to a well-formed query that was refused or carried bad input.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            ResolutionError::DirectiveNotFound { .. } | ResolutionError::PlatformMismatch { .. }
        )
    }
}

/// Errors reading operator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid log level {0:?}")]
    LogLevel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_error_display() {
        let e = FieldValidationError::new("target", "value is empty");
        assert_eq!(e.to_string(), "invalid target: value is empty");
    }

    #[test]
    fn denial_is_not_validation() {
        let denied = ResolutionError::QueryDenied {
            directive: "d".into(),
            rule: 1,
        };
        let invalid: ResolutionError = FieldValidationError::new("target", "bad").into();
        assert_ne!(denied.kind(), invalid.kind());
        assert!(!denied.is_bad_request());
    }

    #[test]
    fn not_found_is_bad_request() {
        let e = ResolutionError::DirectiveNotFound { id: "x".into() };
        assert!(e.is_bad_request());
        assert_eq!(e.kind(), "directive_not_found");
    }
}
