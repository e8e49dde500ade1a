//! Codec interface plus the three interchangeable wire formats.

mod binary;
mod json;
mod text;

pub use binary::BinaryCodec;
pub use json::JsonCodec;
pub use text::TextCodec;

use crate::error::Result;
use crate::node::SerNodeInfo;
use crate::stream::Stream;

/// One format's framing for a single `SerNodeInfo`, written/read one node at
/// a time (base spec §4.F).
///
/// A codec never aborts a read on a malformed node; it returns a
/// `SerNodeInfo` with `is_damaged` set instead (base spec §4.F "Damage
/// model").
pub trait Codec {
    fn write(&self, node: &SerNodeInfo, stream: &mut dyn Stream) -> Result<()>;

    /// Reads the next node, or `Ok(None)` at end of stream.
    fn read(&self, stream: &mut dyn Stream) -> Result<Option<SerNodeInfo>>;
}

/// Selects which on-disk format a [`Serializer`](crate::serializer::Serializer)
/// call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Binary,
    Text,
    Json,
}

impl Format {
    #[must_use]
    pub fn codec(self) -> Box<dyn Codec> {
        match self {
            Self::Binary => Box::new(BinaryCodec),
            Self::Text => Box::new(TextCodec),
            Self::Json => Box::new(JsonCodec::default()),
        }
    }
}
