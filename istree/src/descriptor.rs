//! Property descriptor: the named, typed, erased handle over one property.

use crate::rtti::Rtti;

/// Whether a descriptor can be read, written, both, or neither.
///
/// This is always a function of which of get/set are populated (base spec
/// §3: "`access` is a function of which of get/set are populated").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    None,
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    #[must_use]
    pub const fn from_parts(has_get: bool, has_set: bool) -> Self {
        match (has_get, has_set) {
            (true, true) => Self::ReadWrite,
            (true, false) => Self::ReadOnly,
            (false, true) => Self::WriteOnly,
            (false, false) => Self::None,
        }
    }

    #[must_use]
    pub const fn can_read(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    #[must_use]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// Whether a named publication is a plain value, a stream, a fat pointer,
/// or a nested object (owned or referenced).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationShape {
    Value,
    Stream,
    FatPointer,
    Object,
}

/// Metadata describing one property of a [`Publisher`](crate::publisher::Publisher).
///
/// This is pure metadata: name, RTTI, access, and (for fat pointers) the
/// symbolic reference id. Getting and setting the actual value happens
/// through the owning [`Publisher`]'s `read_value`/`write_value`/
/// `read_object`/`object_mut` methods, addressed by name, rather than
/// through closures stored on the descriptor itself — this sidesteps having
/// a `Descriptor<'a>` borrow its owner for as long as it's alive, which
/// would make `publications()` impossible to express safely for a `&self`
/// borrow and a `&mut self` borrow at once. See `DESIGN.md`.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub name: String,
    pub rtti: Rtti,
    pub access: Access,
    pub shape: PublicationShape,
    /// For fat pointers (`Kind::Delegate`/`Kind::Function`): the symbolic id
    /// this descriptor resolves to, if known statically. Most fat-pointer
    /// descriptors resolve this dynamically instead (via the registry at
    /// store time), in which case this stays `None`.
    pub reference_id: Option<String>,
}

impl Descriptor {
    #[must_use]
    pub const fn new(name: String, rtti: Rtti, access: Access, shape: PublicationShape) -> Self {
        Self {
            name,
            rtti,
            access,
            shape,
            reference_id: None,
        }
    }

    #[must_use]
    pub fn with_reference_id(mut self, id: impl Into<String>) -> Self {
        self.reference_id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_is_a_function_of_get_set_presence() {
        assert_eq!(Access::from_parts(true, true), Access::ReadWrite);
        assert_eq!(Access::from_parts(true, false), Access::ReadOnly);
        assert_eq!(Access::from_parts(false, true), Access::WriteOnly);
        assert_eq!(Access::from_parts(false, false), Access::None);
    }
}
