//! Error handling types.
//!
//! The serde docs suggest a data format should expose one shared error type.
//! We follow the same philosophy here: every fallible operation in this
//! crate, from codec framing to registry conflicts, returns the one
//! [`Error`] enum below rather than a per-module taxonomy.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// Every way a store, load, or registry operation in this crate can fail.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The underlying [`Stream`](crate::stream::Stream) reported an I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A codec could not parse a frame at all (as opposed to one field of an
    /// otherwise-parseable frame, which is recorded as node damage instead).
    #[error("malformed {codec} frame: {reason}")]
    MalformedFrame {
        codec: &'static str,
        reason: String,
    },

    /// A setter/getter accessor pair disagreed on RTTI at publisher
    /// construction time. This is a programming error, not a data error.
    #[error("accessor pair for `{name}` disagrees on type: getter is {getter}, setter is {setter}")]
    AccessorRttiMismatch {
        name: String,
        getter: crate::rtti::Rtti,
        setter: crate::rtti::Rtti,
    },

    /// A sequence or array value was asked to serialize without a length
    /// that fits the wire format.
    #[error("array length {0} does not fit the wire format")]
    LengthOverflow(usize),

    /// Tried to decode a value whose bytes don't match its declared RTTI
    /// (e.g. a `bool` byte that isn't 0 or 1, or a `char` array with
    /// invalid UTF-8).
    #[error("invalid encoded value for {0}")]
    InvalidValue(crate::rtti::Rtti),

    /// [`ReferenceRegistry::store`](crate::registry::ReferenceRegistry::store)
    /// was asked to bind an id that is already bound to a different pointer.
    #[error("id `{0}` is already registered to a different object")]
    RegistryConflict(String),

    /// An empty id was passed where a non-empty one is required.
    #[error("reference ids must not be empty")]
    EmptyReferenceId,

    /// The serializer engine was asked to begin an operation while already
    /// mid-operation (i.e. not in the `Idle` state), or a random-access
    /// operation was attempted outside of a loaded IST.
    #[error("serializer is not idle: currently {0}")]
    NotIdle(&'static str),

    /// [`Serializer::find_node`](crate::serializer::Serializer::find_node)
    /// could not resolve a dotted identifier chain.
    #[error("no node found for path `{0}`")]
    NodeNotFound(String),

    /// Another reason provided by caller code (callbacks, custom
    /// [`Publisher`](crate::publisher::Publisher) implementations).
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Builds a [`Error::Custom`] from any displayable message, mirroring
    /// `serde::de::Error::custom`/`serde::ser::Error::custom`.
    pub fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}
