//! Error type raised by Backtory storage clients.

use thiserror::Error;

/// Errors from Backtory client operations.
///
/// `NotFound` and `Rejected` form the distinguished kind: the service
/// answered, and the answer was "no such object" or "refused". Everything
/// else means the call itself did not complete as a conversation with the
/// service.
#[derive(Debug, Error)]
pub enum BacktoryError {
    /// The object or directory does not exist.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The service refused the operation.
    #[error("Operation rejected: {0}")]
    Rejected(String),

    /// The request could not be delivered or the connection failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The client settings are unusable.
    #[error("Invalid client configuration: {0}")]
    Config(String),

    /// The service answered with something that could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// IO error while preparing or reading an upload.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BacktoryError {
    /// Whether this is the distinguished "not found / operation failed" kind.
    pub fn is_distinguished(&self) -> bool {
        matches!(self, BacktoryError::NotFound(_) | BacktoryError::Rejected(_))
    }

    /// Map an OpenDAL error for `path` onto the client error kinds.
    pub(crate) fn from_opendal(path: &str, err: opendal::Error) -> Self {
        use opendal::ErrorKind;

        match err.kind() {
            ErrorKind::NotFound => BacktoryError::NotFound(path.to_string()),
            ErrorKind::IsADirectory
            | ErrorKind::NotADirectory
            | ErrorKind::AlreadyExists
            | ErrorKind::PermissionDenied
            | ErrorKind::IsSameFile
            | ErrorKind::Unsupported => BacktoryError::Rejected(format!("{}: {}", path, err)),
            ErrorKind::ConfigInvalid => BacktoryError::Config(err.to_string()),
            _ => BacktoryError::Transport(format!("{}: {}", path, err)),
        }
    }
}
