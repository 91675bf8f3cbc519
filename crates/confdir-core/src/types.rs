//! Core directory protocol types.
//!
//! These are the values exchanged with the protocol library that owns the wire: the result
//! codes it encodes and the connection metadata it hands to each request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// LDAP result codes produced by the directory core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    /// Operation completed
    Success,
    /// Unrecognized query classification or malformed filter
    OperationsError,
    /// Bind rejected, for every cause
    InvalidCredentials,
    /// Search outside the caller's permitted scope
    InsufficientAccessRights,
}

impl ResultCode {
    /// Returns the numeric code defined by RFC 4511.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::Success => 0,
            Self::OperationsError => 1,
            Self::InvalidCredentials => 49,
            Self::InsufficientAccessRights => 50,
        }
    }

    /// Returns the RFC 4511 name of the result code.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::OperationsError => "operationsError",
            Self::InvalidCredentials => "invalidCredentials",
            Self::InsufficientAccessRights => "insufficientAccessRights",
        }
    }

    /// Returns true for [`ResultCode::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Connection metadata supplied by the protocol library with each request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Remote peer address, when known
    pub remote_addr: Option<SocketAddr>,
}

impl ConnectionInfo {
    /// Create connection info for a known peer.
    #[must_use]
    pub const fn new(remote_addr: SocketAddr) -> Self {
        Self {
            remote_addr: Some(remote_addr),
        }
    }

    /// Connection info with no peer address (tests, in-process callers).
    #[must_use]
    pub const fn unknown() -> Self {
        Self { remote_addr: None }
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remote_addr {
            Some(addr) => write!(f, "{addr}"),
            None => f.write_str("unknown"),
        }
    }
}
