use service_core::error::AppError;
use thiserror::Error;

pub type DataResult<T> = Result<T, DataError>;

/// Failure of a data-service call. Each variant is a distinct kind so callers
/// can tell "we sent garbage" from "the service said no" from "the service
/// answered with something we cannot read".
#[derive(Debug, Error)]
pub enum DataError {
    /// Rejected before any network call was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Connection, TLS or timeout failure. Not retried here.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote service answered with status >= 400.
    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// The status was fine but the body did not fit the destination type.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Single-row read matched no rows.
    #[error("No matching row")]
    NotFound,

    /// Single-row read matched more than one row.
    #[error("More than one matching row")]
    Ambiguous,
}

impl DataError {
    pub fn invalid(message: impl Into<String>) -> Self {
        DataError::InvalidInput(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, DataError::Transport(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DataError::Transport(e) if e.is_timeout())
    }

    /// HTTP status of a remote rejection, if that is what this is.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            DataError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::InvalidInput(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            DataError::NotFound => AppError::NotFound(anyhow::anyhow!("Resource not found")),
            DataError::Ambiguous => {
                AppError::Conflict(anyhow::anyhow!("More than one resource matched"))
            }
            DataError::Transport(e) => AppError::BadGateway(anyhow::Error::new(e)),
            e @ (DataError::Remote { .. } | DataError::Decode(_)) => {
                AppError::UpstreamError(anyhow::Error::new(e))
            }
        }
    }
}
