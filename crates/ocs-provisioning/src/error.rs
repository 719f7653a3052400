use thiserror::Error;

/// Errors from provisioning calls.
#[derive(Debug, Error)]
pub enum Error {
    /// The server answered with a failure, or could not be reached.
    #[error(transparent)]
    Ocs(#[from] ocs_status::Error),

    /// An identifier was rejected before any request was sent.
    #[error("invalid {field} '{value}': {reason}")]
    Validation {
        /// Which argument was rejected.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Form body encoding failed.
    #[error("form encoding error: {0}")]
    Encoding(#[from] serde_urlencoded::ser::Error),
}

impl Error {
    /// The translated server-side error, if this is one.
    pub fn as_ocs(&self) -> Option<&ocs_status::Error> {
        match self {
            Error::Ocs(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for provisioning calls.
pub type Result<T> = std::result::Result<T, Error>;
