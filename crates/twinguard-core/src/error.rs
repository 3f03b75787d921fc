//! Shared error type across twinguard crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Resource type tag or path is not well formed.
    InvalidResourceKey,
    /// Permission name outside the supported set.
    UnsupportedPermission,
    /// Policy violates a structural invariant.
    MalformedPolicy,
    /// Unparsable payload or configuration.
    BadRequest,
    /// Unsupported configuration version.
    UnsupportedVersion,
    /// Denied by policy.
    NotAllowed,
    /// Policy or thing is unknown to a collaborator.
    NotFound,
    /// Internal error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::InvalidResourceKey => "INVALID_RESOURCE_KEY",
            ClientCode::UnsupportedPermission => "UNSUPPORTED_PERMISSION",
            ClientCode::MalformedPolicy => "MALFORMED_POLICY",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::NotAllowed => "NOT_ALLOWED",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TwinGuardError>;

/// Unified error type used by core and enforcer.
///
/// Validation failures (`InvalidResourceKey`, `UnsupportedPermission`,
/// `MalformedPolicy`) are raised at the boundary, before any decision is
/// made. `NotAllowed` is the only variant meaning "the policy said no".
#[derive(Debug, Error)]
pub enum TwinGuardError {
    #[error("invalid resource key: {0}")]
    InvalidResourceKey(String),
    #[error("unsupported permission: {0}")]
    UnsupportedPermission(String),
    #[error("malformed policy: {0}")]
    MalformedPolicy(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("not allowed: {0}")]
    NotAllowed(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl TwinGuardError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            TwinGuardError::InvalidResourceKey(_) => ClientCode::InvalidResourceKey,
            TwinGuardError::UnsupportedPermission(_) => ClientCode::UnsupportedPermission,
            TwinGuardError::MalformedPolicy(_) => ClientCode::MalformedPolicy,
            TwinGuardError::BadRequest(_) => ClientCode::BadRequest,
            TwinGuardError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            TwinGuardError::NotAllowed(_) => ClientCode::NotAllowed,
            TwinGuardError::NotFound(_) => ClientCode::NotFound,
            TwinGuardError::Internal(_) => ClientCode::Internal,
        }
    }

    /// True for errors produced by input validation (never an authorization outcome).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TwinGuardError::InvalidResourceKey(_)
                | TwinGuardError::UnsupportedPermission(_)
                | TwinGuardError::MalformedPolicy(_)
                | TwinGuardError::BadRequest(_)
        )
    }
}
