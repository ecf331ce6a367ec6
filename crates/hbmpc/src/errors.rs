use std::time::Duration;
use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Indicates that an error in the underlying mathematical library was
    /// encountered.
    #[error("{0}")]
    MathError(hbmpc_math::Error),

    /// Indicates that the parameters are invalid.
    #[error("{0}")]
    ParametersError(ParametersError),

    /// Indicates a share or a batch of shares that cannot be used, e.g. a
    /// length mismatch or a share of the wrong degree.
    #[error("Malformed share: {0}")]
    MalformedShare(String),

    /// Indicates that too few values were provided.
    #[error("Too few values provided: {0} is below limit {1}")]
    TooFewValues(usize, usize),

    /// Indicates a party index outside of the session.
    #[error("Invalid party: {0}")]
    InvalidParty(usize),

    /// Indicates that a reconstruction round heard from every sender without
    /// being able to decode.
    #[error("Reconstruction failed: {0}")]
    ReconstructionFailed(String),

    /// Indicates that an operation did not complete in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Indicates that the other end of a channel is gone.
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Indicates that the receiving end of a tagged channel was already
    /// handed out.
    #[error("Channel already in use: {0}")]
    ChannelInUse(String),

    /// Indicates that no preprocessed element of the requested kind is left.
    #[error("Preprocessing exhausted: no {0} left for party {1}")]
    PreprocessingExhausted(String, usize),

    /// Indicates that a RanDouSha checker rejected the dealt sharings.
    #[error("RanDouSha aborted: {0}")]
    RanDouShaAborted(String),

    /// Indicates that no program is registered under this name.
    #[error("Unknown program: {0}")]
    UnknownProgram(String),

    /// Indicates that a program failed or panicked on some party.
    #[error("Program failed on party {0}: {1}")]
    ProgramFailed(usize, String),

    /// Indicates a default error.
    #[error("{0}")]
    DefaultError(String),
}

impl From<hbmpc_math::Error> for Error {
    fn from(e: hbmpc_math::Error) -> Self {
        Error::MathError(e)
    }
}

impl From<ParametersError> for Error {
    fn from(e: ParametersError) -> Self {
        Error::ParametersError(e)
    }
}

/// Separate enum to indicate parameters-related errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParametersError {
    /// Indicates that the number of parties is invalid.
    #[error("Invalid number of parties: {0}")]
    InvalidPartyCount(usize),

    /// Indicates that the threshold is invalid for the number of parties.
    #[error("Invalid threshold: {0} for {1} parties, expected 1 <= t and 3t + 1 <= n")]
    InvalidThreshold(usize, usize),

    /// Indicates that there are more parties than non-zero field elements.
    #[error("Too many parties: {0} parties do not fit modulo {1}")]
    TooManyParties(usize, u64),
}

/// Helpers to create errors raised at the protocol boundary.
impl Error {
    /// Create a malformed share error.
    pub fn malformed_share<S: Into<String>>(msg: S) -> Self {
        Self::MalformedShare(msg.into())
    }

    /// Create a length mismatch error between two batches.
    pub fn length_mismatch(expected: usize, found: usize) -> Self {
        Self::MalformedShare(format!(
            "length mismatch: expected {} shares, found {}",
            expected, found
        ))
    }
}
