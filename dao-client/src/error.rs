use thiserror::Error;

/// Errors surfaced by the DAO client.
///
/// Unrecognized payload tags are not errors; they are carried as
/// [`crate::models::ProposalPayload::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DaoError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    #[error("Fetch failure: {0}")]
    FetchFailure(String),

    #[error("Precision mismatch: expected {expected} decimals, found {found}")]
    PrecisionMismatch { expected: u32, found: u32 },
}

impl DaoError {
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        DaoError::InvalidAddress(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        DaoError::DecodeFailure(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        DaoError::FetchFailure(msg.into())
    }

    /// Whether the error came from the transport rather than from the data.
    pub fn is_transport(&self) -> bool {
        matches!(self, DaoError::FetchFailure(_))
    }
}

impl From<reqwest::Error> for DaoError {
    fn from(err: reqwest::Error) -> Self {
        DaoError::FetchFailure(err.to_string())
    }
}

impl From<serde_json::Error> for DaoError {
    fn from(err: serde_json::Error) -> Self {
        DaoError::DecodeFailure(err.to_string())
    }
}

impl From<alloy_sol_types::Error> for DaoError {
    fn from(err: alloy_sol_types::Error) -> Self {
        DaoError::DecodeFailure(err.to_string())
    }
}

pub type DaoResult<T> = Result<T, DaoError>;
