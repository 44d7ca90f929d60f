//! Error types for the convergence system.
//!
//! This module provides the error hierarchy for every stage of a
//! reconciliation run: configuration, platform calls, planning and
//! orchestration.

use std::path::PathBuf;
use thiserror::Error;

use crate::diff::EntityKind;

/// The main error type for the convergence system.
#[derive(Debug, Error)]
pub enum CfConvergeError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote platform errors.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// The document has no target section but a remote command needs one.
    #[error("No target configured: set 'target' in the document or CFCONVERGE_API/ORGANIZATION/SPACE")]
    MissingTarget,
}

/// Errors raised while turning change lists into units of work.
///
/// None of these touch the remote platform: they are raised before any
/// call for the affected entity is issued.
#[derive(Debug, Error)]
pub enum PlanError {
    /// An argument to the differ or a planner is unusable.
    #[error("Precondition violated: {message}")]
    PreconditionViolation {
        /// Description of the violated precondition.
        message: String,
    },

    /// The change list cannot describe any state transition of the entity.
    #[error("Invalid change set for {kind} '{entity}': {message}")]
    InvariantViolation {
        /// Kind of the entity being planned.
        kind: EntityKind,
        /// Name of the entity being planned.
        entity: String,
        /// Description of the violation.
        message: String,
    },

    /// The entity kind cannot apply this change in place.
    #[error("Change type is not supported. ({kind} '{entity}': {change})")]
    UnsupportedChange {
        /// Kind of the entity being planned.
        kind: EntityKind,
        /// Name of the entity being planned.
        entity: String,
        /// Rendering of the rejected change.
        change: String,
    },
}

/// Remote platform errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Authentication failed.
    #[error("Platform authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("Platform API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
    },

    /// Rate limited.
    #[error("Platform API rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// A named resource does not exist.
    #[error("{resource_type} not found: {name}")]
    NotFound {
        /// Type of the missing resource.
        resource_type: String,
        /// Name of the missing resource.
        name: String,
    },

    /// A resource with this name already exists.
    #[error("{resource_type} already exists: {name}")]
    AlreadyExists {
        /// Type of the conflicting resource.
        resource_type: String,
        /// Name of the conflicting resource.
        name: String,
    },

    /// Network error.
    #[error("Network error communicating with the platform: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from platform API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A remote call for one entity failed.
    #[error("Apply failed for {kind} '{name}': {source}")]
    ApplyFailed {
        /// Kind of the entity.
        kind: EntityKind,
        /// Name of the entity.
        name: String,
        /// Underlying failure.
        #[source]
        source: Box<CfConvergeError>,
    },

    /// The live state of a kind could not be fetched.
    #[error("Failed to fetch live {kind}: {source}")]
    FetchFailed {
        /// Kind whose live state was requested.
        kind: EntityKind,
        /// Underlying failure.
        #[source]
        source: Box<CfConvergeError>,
    },
}

/// Result type alias for convergence operations.
pub type Result<T> = std::result::Result<T, CfConvergeError>;

impl CfConvergeError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is a transient transport failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Platform(PlatformError::RateLimited { .. } | PlatformError::NetworkError { .. })
        )
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Platform(PlatformError::RateLimited { retry_after_secs }) => {
                Some(*retry_after_secs)
            }
            Self::Platform(PlatformError::NetworkError { .. }) => Some(1),
            _ => None,
        }
    }

    /// Returns true if this error was raised by a planner before any remote call.
    #[must_use]
    pub const fn is_planning_error(&self) -> bool {
        matches!(self, Self::Plan(_))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl PlanError {
    /// Creates a precondition violation.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            message: message.into(),
        }
    }

    /// Creates an invariant violation for an entity.
    #[must_use]
    pub fn invariant(kind: EntityKind, entity: &str, message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            kind,
            entity: entity.to_string(),
            message: message.into(),
        }
    }
}

impl PlatformError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl ReconcileError {
    /// Wraps a remote failure for one entity.
    #[must_use]
    pub fn apply_failed(kind: EntityKind, name: &str, source: CfConvergeError) -> Self {
        Self::ApplyFailed {
            kind,
            name: name.to_string(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_change_message() {
        let err = PlanError::UnsupportedChange {
            kind: EntityKind::Services,
            entity: String::from("db"),
            change: String::from("tags"),
        };
        assert!(err.to_string().starts_with("Change type is not supported."));
    }

    #[test]
    fn test_apply_failed_keeps_source() {
        let err = ReconcileError::apply_failed(
            EntityKind::Applications,
            "app1",
            PlatformError::api_error(500, "boom").into(),
        );
        assert!(err.to_string().contains("app1"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_retryable_errors() {
        let rate: CfConvergeError = PlatformError::RateLimited { retry_after_secs: 3 }.into();
        assert!(rate.is_retryable());
        assert_eq!(rate.retry_delay_secs(), Some(3));

        let api: CfConvergeError = PlatformError::api_error(400, "bad").into();
        assert!(!api.is_retryable());
        assert_eq!(api.retry_delay_secs(), None);
    }
}
