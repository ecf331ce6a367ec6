#![crate_name = "hbmpc_traits"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Traits shared by the crates of the hbmpc workspace.

/// Serialization of a value into bytes.
pub trait Serialize {
    /// Serialize `Self` into a vector of bytes.
    fn to_bytes(&self) -> Vec<u8>;
}

/// Deserialization of a value that only makes sense within a context, such
/// as a field element which needs its modulus.
pub trait DeserializeWithContext
where
    Self: Sized,
{
    /// The type of error returned.
    type Error;

    /// The type of context.
    type Context;

    /// Attempt to deserialize from a slice of bytes within a context.
    fn from_bytes(bytes: &[u8], ctx: &Self::Context) -> Result<Self, Self::Error>;
}
