//! Unified application error types for Breakglass.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The impersonation core only ever
//! returns typed [`ErrorKind`]s; translating them into transport status
//! codes is the job of whatever layer sits in front of it, guided by
//! [`ErrorKind::class`].

use std::fmt;
use thiserror::Error;

/// Error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The impersonator and the target are the same user.
    CannotImpersonateSelf,
    /// The justification (reason or ticket) does not satisfy policy.
    InvalidReason,
    /// The requested duration is outside the configured bounds.
    InvalidDuration,
    /// Generic input validation failure (malformed filters, bad identifiers).
    Validation,
    /// The actor is not allowed to perform the operation.
    PermissionDenied,
    /// The actor already holds an effectively active impersonation in this scope.
    AlreadyImpersonating,
    /// No impersonation with that ID exists in the caller's tenant scope.
    ImpersonationNotFound,
    /// A referenced user does not exist.
    UserNotFound,
    /// A referenced issued session does not exist.
    SessionNotFound,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A collaborator service (session issuer, authorizer, directory) failed.
    ExternalService,
    /// An internal error occurred.
    Internal,
}

/// Coarse classification of an [`ErrorKind`] for boundary layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The caller must correct the input and resubmit.
    Validation,
    /// The referenced resource does not exist (or is not visible).
    NotFound,
    /// The actor is not permitted.
    Forbidden,
    /// A business-rule conflict with existing state.
    Conflict,
    /// Infrastructure failure; details are not exposed.
    Internal,
}

impl ErrorKind {
    /// Returns the boundary classification for this kind.
    pub fn class(self) -> ErrorClass {
        match self {
            Self::CannotImpersonateSelf
            | Self::InvalidReason
            | Self::InvalidDuration
            | Self::Validation => ErrorClass::Validation,
            Self::PermissionDenied => ErrorClass::Forbidden,
            Self::AlreadyImpersonating => ErrorClass::Conflict,
            Self::ImpersonationNotFound | Self::UserNotFound | Self::SessionNotFound => {
                ErrorClass::NotFound
            }
            Self::Database
            | Self::Configuration
            | Self::Serialization
            | Self::ExternalService
            | Self::Internal => ErrorClass::Internal,
        }
    }

    /// Whether the same caller may succeed by retrying later.
    ///
    /// Only a conflict with an existing impersonation qualifies: it clears
    /// once that impersonation ends or expires.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::AlreadyImpersonating)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CannotImpersonateSelf => write!(f, "CANNOT_IMPERSONATE_SELF"),
            Self::InvalidReason => write!(f, "INVALID_REASON"),
            Self::InvalidDuration => write!(f, "INVALID_DURATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::PermissionDenied => write!(f, "PERMISSION_DENIED"),
            Self::AlreadyImpersonating => write!(f, "ALREADY_IMPERSONATING"),
            Self::ImpersonationNotFound => write!(f, "IMPERSONATION_NOT_FOUND"),
            Self::UserNotFound => write!(f, "USER_NOT_FOUND"),
            Self::SessionNotFound => write!(f, "SESSION_NOT_FOUND"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::ExternalService => write!(f, "EXTERNAL_SERVICE"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout Breakglass.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a self-impersonation error.
    pub fn cannot_impersonate_self() -> Self {
        Self::new(
            ErrorKind::CannotImpersonateSelf,
            "An actor cannot impersonate themselves",
        )
    }

    /// Create an invalid-reason error.
    pub fn invalid_reason(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidReason, message)
    }

    /// Create an invalid-duration error.
    pub fn invalid_duration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidDuration, message)
    }

    /// Create a generic validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a permission-denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    /// Create an already-impersonating conflict.
    pub fn already_impersonating(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyImpersonating, message)
    }

    /// Create the not-found error returned for missing *and* foreign-tenant
    /// impersonations. The message never mentions the tenant.
    pub fn impersonation_not_found() -> Self {
        Self::new(ErrorKind::ImpersonationNotFound, "Impersonation not found")
    }

    /// Create a user-not-found error.
    pub fn user_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UserNotFound, message)
    }

    /// Create a session-not-found error.
    pub fn session_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SessionNotFound, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an external-service error.
    pub fn external_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Returns the boundary classification of this error.
    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    /// Returns `true` if this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::with_source(ErrorKind::Internal, "Row not found", err),
            _ => Self::with_source(ErrorKind::Database, format!("Database error: {err}"), err),
        }
    }
}
