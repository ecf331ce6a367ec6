use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Indicates that the modulus is not a prime.
    #[error("Invalid modulus: {0} is not a prime")]
    InvalidModulus(u64),

    /// Indicates that the parameters are inconsistent, e.g. `k > n`.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Indicates that a message cannot be encoded.
    #[error("Message too large: {0}")]
    MessageTooLarge(String),

    /// Indicates that there are too many erasures or errors to decode.
    #[error("Undecodable: {0}")]
    Undecodable(String),

    /// Indicates that no error budget yields an error locator dividing Q.
    #[error("No divisor found: no error locator divides the numerator polynomial")]
    NoDivisorFound,

    /// Indicates a division by the zero field element.
    #[error("Division by zero")]
    DivisionByZero,

    /// Indicates a division by the zero polynomial.
    #[error("Division by the zero polynomial")]
    DivisionByZeroPolynomial,

    /// Indicates that too few points were given.
    #[error("Insufficient points: got {0}, need at least {1}")]
    InsufficientPoints(usize, usize),

    /// Indicates that two points share the same abscissa.
    #[error("Duplicate abscissa: {0}")]
    DuplicateAbscissa(u64),

    /// Indicates a serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Indicates a default error.
    #[error("{0}")]
    Default(String),
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn error_strings() {
        assert_eq!(
            Error::InvalidModulus(10).to_string(),
            "Invalid modulus: 10 is not a prime"
        );
        assert_eq!(
            Error::InsufficientPoints(0, 1).to_string(),
            "Insufficient points: got 0, need at least 1"
        );
        assert_eq!(Error::DivisionByZero.to_string(), "Division by zero");
        assert_eq!(
            Error::Undecodable("too many erasures".to_string()).to_string(),
            "Undecodable: too many erasures"
        );
    }
}
