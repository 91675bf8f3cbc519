//! Error types for directory operations.
//!
//! Every failure in the directory core is a per-request outcome. Each variant maps onto the
//! LDAP result code the protocol layer reports to the client, and bind-path failures all
//! collapse to `invalidCredentials` so clients cannot tell which check rejected them.

use thiserror::Error;

use crate::types::ResultCode;

/// Main error type for directory operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The distinguished name does not have the expected shape
    #[error("Malformed identity: {0}")]
    IdentityFormat(String),

    /// User or group not present in the configuration
    #[error("Not found: {0}")]
    NotFound(String),

    /// The user's primary group does not match the group named in the bind DN
    #[error("Membership mismatch: {0}")]
    MembershipMismatch(String),

    /// Password digest or one-time code rejected
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Caller is not allowed to search the requested scope
    #[error("Insufficient access: {0}")]
    InsufficientAccess(String),

    /// The search could not be classified into a supported object class
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Specialized result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::IdentityFormat(_) => "IDENTITY_FORMAT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::MembershipMismatch(_) => "MEMBERSHIP_MISMATCH",
            Self::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            Self::InsufficientAccess(_) => "INSUFFICIENT_ACCESS",
            Self::UnsupportedQuery(_) => "UNSUPPORTED_QUERY",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the LDAP result code reported to the client for this error.
    #[must_use]
    pub const fn result_code(&self) -> ResultCode {
        match self {
            Self::IdentityFormat(_)
            | Self::NotFound(_)
            | Self::MembershipMismatch(_)
            | Self::InvalidCredentials(_) => ResultCode::InvalidCredentials,
            Self::InsufficientAccess(_) => ResultCode::InsufficientAccessRights,
            Self::UnsupportedQuery(_)
            | Self::ConfigError(_)
            | Self::ValidationError(_)
            | Self::InternalError(_) => ResultCode::OperationsError,
        }
    }

    /// Returns true if this error points at an operator problem rather than a client mistake.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::InternalError(_) | Self::ConfigError(_) | Self::ValidationError(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::IdentityFormat("x".to_string()).error_code(),
            "IDENTITY_FORMAT"
        );
        assert_eq!(Error::NotFound("x".to_string()).error_code(), "NOT_FOUND");
        assert_eq!(
            Error::MembershipMismatch("x".to_string()).error_code(),
            "MEMBERSHIP_MISMATCH"
        );
        assert_eq!(
            Error::InvalidCredentials("x".to_string()).error_code(),
            "INVALID_CREDENTIALS"
        );
        assert_eq!(
            Error::InsufficientAccess("x".to_string()).error_code(),
            "INSUFFICIENT_ACCESS"
        );
        assert_eq!(
            Error::UnsupportedQuery("x".to_string()).error_code(),
            "UNSUPPORTED_QUERY"
        );
        assert_eq!(
            Error::ConfigError("x".to_string()).error_code(),
            "CONFIG_ERROR"
        );
    }

    #[test]
    fn test_bind_path_errors_collapse_to_invalid_credentials() {
        for err in [
            Error::IdentityFormat("dn".to_string()),
            Error::NotFound("alice".to_string()),
            Error::MembershipMismatch("alice".to_string()),
            Error::InvalidCredentials("digest".to_string()),
        ] {
            assert_eq!(err.result_code(), ResultCode::InvalidCredentials);
        }
    }

    #[test]
    fn test_search_path_result_codes() {
        assert_eq!(
            Error::InsufficientAccess("anonymous".to_string()).result_code(),
            ResultCode::InsufficientAccessRights
        );
        assert_eq!(
            Error::UnsupportedQuery("organization".to_string()).result_code(),
            ResultCode::OperationsError
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("user `bob`".to_string());
        assert_eq!(err.to_string(), "Not found: user `bob`");
    }

    #[test]
    fn test_should_log() {
        assert!(Error::InternalError("clock".to_string()).should_log());
        assert!(Error::ConfigError("bad json".to_string()).should_log());
        assert!(!Error::InvalidCredentials("digest".to_string()).should_log());
        assert!(!Error::InsufficientAccess("scope".to_string()).should_log());
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let converted: Error = err.into();
        assert!(matches!(converted, Error::ConfigError(_)));
    }
}
