//! `istree`: a general-purpose object persistence framework built around an
//! Intermediate Serialization Tree (IST).
//!
//! A [`Publisher`](publisher::Publisher) exposes its properties as a flat
//! list of [`Descriptor`](descriptor::Descriptor)s. A [`Serializer`]
//! (serializer::Serializer) walks a publisher graph into an [`Ist`](node::Ist),
//! and an [`Ist`](node::Ist) through one of three interchangeable wire codecs
//! (binary, text, JSON) onto a [`Stream`](stream::Stream). Cross-object
//! references and fat pointers resolve through an explicit
//! [`ReferenceRegistry`](registry::ReferenceRegistry) rather than a global.
//!
//! Typical usage derives [`Publisher`](publisher::Publisher) with
//! `#[derive(Publish)]` (see `istree_macros`) and drives a
//! [`Serializer`](serializer::Serializer) directly; [`DynPublisher`]
//! (publisher::DynPublisher) and [`PropertyBinder`](binder::PropertyBinder)
//! exist for ad-hoc or UI-facing uses that don't warrant a derive.

pub mod binder;
pub mod codec;
pub mod declarator;
pub mod descriptor;
pub mod error;
pub mod node;
pub mod publisher;
pub mod reference;
pub mod registry;
pub mod rtti;
pub mod serializer;
pub mod stream;
pub mod value;

pub use binder::PropertyBinder;
pub use codec::{BinaryCodec, Codec, Format, JsonCodec, TextCodec};
pub use declarator::DeclaratorId;
pub use descriptor::{Access, Descriptor, PublicationShape};
pub use error::{Error, Result};
pub use node::{Ist, NodeId, SerNodeInfo};
pub use publisher::{
    DynPublisher, ObjectSlotMut, ObjectView, Publisher, ValueCell, WantDescriptorCallback,
    WantObjectCallback, WantObjectOutcome, WantReason,
};
pub use reference::{Ref, RefSlot};
pub use registry::ReferenceRegistry;
pub use rtti::{Kind, Rtti};
pub use serializer::{EngineState, Serializer};
pub use stream::{FileStream, MemoryStream, Stream};
pub use value::{ArrayValue, PropertyValue, Scalar, Value};

pub use istree_macros::Publish;
