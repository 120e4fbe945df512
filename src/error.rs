use strum_macros::{AsRefStr, Display};
use thiserror::Error;

use crate::models::AttendanceId;
use crate::rpc::RpcError;

/// Every failure a caller can observe, flattened to one taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
pub enum ErrorKind {
    Timeout,
    NetworkError,
    TransportError,
    RemoteError,
    InvalidCredentials,
    NotAuthenticated,
    NotConfigured,
    AlreadyCheckedIn,
    ValidationError,
    ConflictError,
    DecodeError,
}

/// Errors surfaced by the session and attendance managers.
///
/// `Display` is the text the UI shows verbatim.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// A remote failure re-signalled with a user-facing message.
    #[error("{message}")]
    Service {
        message: &'static str,
        #[source]
        source: RpcError,
    },
    #[error("{0}")]
    Validation(String),
    #[error("You already have an active check-in. Please check out first.")]
    AlreadyCheckedIn,
    #[error("Attendance {0} is already closed or no longer exists.")]
    Conflict(AttendanceId),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn service(message: &'static str) -> impl FnOnce(RpcError) -> Error {
        move |source| Error::Service { message, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Rpc(e) | Error::Service { source: e, .. } => e.kind(),
            Error::Validation(_) => ErrorKind::ValidationError,
            Error::AlreadyCheckedIn => ErrorKind::AlreadyCheckedIn,
            Error::Conflict(_) => ErrorKind::ConflictError,
        }
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Timeout => 1001,
            ErrorKind::NetworkError => 1002,
            ErrorKind::TransportError => 1003,
            ErrorKind::RemoteError => 1004,
            ErrorKind::DecodeError => 1005,
            ErrorKind::InvalidCredentials => 1101,
            ErrorKind::NotAuthenticated => 1102,
            ErrorKind::NotConfigured => 1103,
            ErrorKind::ValidationError => 1201,
            ErrorKind::AlreadyCheckedIn => 1202,
            ErrorKind::ConflictError => 1203,
        }
    }
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Timeout => ErrorKind::Timeout,
            RpcError::Network(_) => ErrorKind::NetworkError,
            RpcError::Transport { .. } => ErrorKind::TransportError,
            RpcError::Remote(_) => ErrorKind::RemoteError,
            RpcError::InvalidCredentials => ErrorKind::InvalidCredentials,
            RpcError::NotAuthenticated => ErrorKind::NotAuthenticated,
            RpcError::NotConfigured => ErrorKind::NotConfigured,
            RpcError::Decode(_) => ErrorKind::DecodeError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_keep_the_underlying_kind() {
        let err = Error::service("Could not retrieve attendance history.")(RpcError::Timeout);
        assert_eq!(err.to_string(), "Could not retrieve attendance history.");
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.code(), 1001);
    }

    #[test]
    fn rpc_errors_display_verbatim() {
        let err = Error::from(RpcError::Remote("Access Denied".into()));
        assert_eq!(err.to_string(), "Access Denied");
        assert_eq!(err.kind(), ErrorKind::RemoteError);
    }

    #[test]
    fn domain_kinds() {
        assert_eq!(Error::AlreadyCheckedIn.kind(), ErrorKind::AlreadyCheckedIn);
        assert_eq!(Error::Conflict(AttendanceId(3)).kind(), ErrorKind::ConflictError);
        assert_eq!(
            Error::Validation("Employee ID is required".into()).kind(),
            ErrorKind::ValidationError
        );
    }
}
