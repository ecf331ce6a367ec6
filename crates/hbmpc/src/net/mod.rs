//! Tagged point-to-point messaging between the parties of a session.
//!
//! Protocols only see [`TaggedChannel`]s: a send side addressed by party
//! index and a single-consumer receive side carrying the messages of one
//! [`Tag`]. The [`Transport`] underneath can be anything delivering
//! [`Envelope`]s; [`Router`] is the in-process one used for simulations and
//! tests.

mod mailbox;
mod router;

pub use mailbox::{Mailbox, TaggedChannel};
pub use router::Router;

use crate::Result;
use std::fmt;

/// Index of a party, in `[0, n)`.
pub type PartyId = usize;

/// Hierarchical message tag, e.g. `open/3/row`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    /// Create a tag.
    pub fn new<S: Into<String>>(tag: S) -> Self {
        Self(tag.into())
    }

    /// The tag `<self>/<part>`.
    pub fn child<D: fmt::Display>(&self, part: D) -> Self {
        Self(format!("{}/{}", self.0, part))
    }

    /// The tag as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// A message in flight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// The sending party.
    pub sender: PartyId,
    /// The protocol instance the message belongs to.
    pub tag: Tag,
    /// Serialized field elements.
    pub payload: Vec<u8>,
}

/// Delivery of envelopes to parties.
///
/// Delivery is asynchronous and unordered across senders; the transport
/// authenticates the `sender` field.
pub trait Transport: Send + Sync {
    /// Queue `envelope` for delivery to party `dest`.
    ///
    /// Returns `Error::InvalidParty` if `dest` is not a party.
    fn send(&self, dest: PartyId, envelope: Envelope) -> Result<()>;

    /// Number of parties reachable through this transport.
    fn parties(&self) -> usize;
}

impl fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transport({} parties)", self.parties())
    }
}
