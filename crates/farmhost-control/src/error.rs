//! Error types for the host manager.
//!
//! This module defines all errors that can occur during host lifecycle,
//! allocation and proc booking operations.

use farmhost_core::{AllocationId, HostId, ProcId};
use farmhost_store::StoreError;
use thiserror::Error;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors that can occur in host manager operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The requested host was not found.
    #[error("host not found: {0}")]
    HostNotFound(HostId),

    /// No host is registered under the given name.
    #[error("no host named {0}")]
    UnknownHostname(String),

    /// The requested allocation was not found.
    #[error("allocation not found: {0}")]
    AllocationNotFound(AllocationId),

    /// No allocation has been designated as the default.
    #[error("no default allocation has been set")]
    NoDefaultAllocation,

    /// The requested proc was not found.
    #[error("proc not found: {0}")]
    ProcNotFound(ProcId),

    /// The operation conflicts with the current state of the host or its procs.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Every item of a bulk unbook failed.
    #[error("failed to unbook all {failed} procs")]
    UnbookFailed {
        /// Number of procs that could not be unbooked.
        failed: usize,
    },

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ControlError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::HostNotFound(_)
            | Self::UnknownHostname(_)
            | Self::AllocationNotFound(_)
            | Self::NoDefaultAllocation
            | Self::ProcNotFound(_)
            | Self::Store(StoreError::NotFound) => 404,
            Self::Conflict(_) | Self::Store(StoreError::Conflict(_)) => 409,
            Self::InvalidRequest(_) => 400,
            Self::UnbookFailed { .. } | Self::Store(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Database(_)) | Self::UnbookFailed { .. } | Self::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        let host_id = HostId::generate();

        assert_eq!(ControlError::HostNotFound(host_id).http_status_code(), 404);
        assert_eq!(
            ControlError::UnknownHostname("render01".into()).http_status_code(),
            404
        );
        assert_eq!(
            ControlError::Conflict("procs bound".into()).http_status_code(),
            409
        );
        assert_eq!(
            ControlError::InvalidRequest("blank name".into()).http_status_code(),
            400
        );
        assert_eq!(
            ControlError::UnbookFailed { failed: 2 }.http_status_code(),
            500
        );
    }

    #[test]
    fn store_errors_keep_their_meaning() {
        assert_eq!(
            ControlError::from(StoreError::NotFound).http_status_code(),
            404
        );
        assert_eq!(
            ControlError::from(StoreError::Conflict("name".into())).http_status_code(),
            409
        );
        assert_eq!(
            ControlError::from(StoreError::Database("io".into())).http_status_code(),
            500
        );
    }

    #[test]
    fn retriable_errors() {
        assert!(ControlError::from(StoreError::Database("io".into())).is_retriable());
        assert!(!ControlError::Conflict("procs bound".into()).is_retriable());
        assert!(!ControlError::from(StoreError::Conflict("name".into())).is_retriable());
    }
}
