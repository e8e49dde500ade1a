//! Runtime type info carried by every descriptor and every IST node.

use std::fmt;

/// The closed set of value kinds the engine handles natively.
///
/// `Delegate` and `Function` are "fat pointer" kinds: their payload is
/// always a reference-id string resolved through the [`ReferenceRegistry`]
/// rather than a bit-copyable value.
///
/// [`ReferenceRegistry`]: crate::registry::ReferenceRegistry
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool = 0,
    Byte = 1,
    UByte = 2,
    Short = 3,
    UShort = 4,
    Int = 5,
    UInt = 6,
    Long = 7,
    ULong = 8,
    Float = 9,
    Double = 10,
    Char = 11,
    WChar = 12,
    DChar = 13,
    Object = 14,
    Stream = 15,
    Delegate = 16,
    Function = 17,
    Invalid = 18,
}

impl Kind {
    /// Size in bytes of one element of this primitive kind on the wire.
    ///
    /// Returns `None` for the non-primitive kinds (`Object`, `Stream`,
    /// `Delegate`, `Function`, `Invalid`), which have no fixed element size.
    #[must_use]
    pub const fn element_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Byte | Self::UByte => Some(1),
            Self::Short | Self::UShort | Self::WChar => Some(2),
            Self::Int | Self::UInt | Self::Float | Self::Char | Self::DChar => Some(4),
            Self::Long | Self::ULong | Self::Double => Some(8),
            Self::Object | Self::Stream | Self::Delegate | Self::Function | Self::Invalid => None,
        }
    }

    /// Stable printable name used by the text and JSON codecs.
    ///
    /// `Delegate`/`Function` use the whitespace-free tokens `GenericDelegate`
    /// and `GenericFunction` so the text codec's single-line format stays
    /// unambiguous.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::UByte => "ubyte",
            Self::Short => "short",
            Self::UShort => "ushort",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Long => "long",
            Self::ULong => "ulong",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
            Self::WChar => "wchar",
            Self::DChar => "dchar",
            Self::Object => "object",
            Self::Stream => "stream",
            Self::Delegate => "GenericDelegate",
            Self::Function => "GenericFunction",
            Self::Invalid => "invalid",
        }
    }

    /// Whether this kind is a fat pointer serialized as a reference-id string.
    #[must_use]
    pub const fn is_fat_pointer(self) -> bool {
        matches!(self, Self::Delegate | Self::Function)
    }

    /// Parses a kind back from its [`Kind::name`] token.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => Self::Bool,
            "byte" => Self::Byte,
            "ubyte" => Self::UByte,
            "short" => Self::Short,
            "ushort" => Self::UShort,
            "int" => Self::Int,
            "uint" => Self::UInt,
            "long" => Self::Long,
            "ulong" => Self::ULong,
            "float" => Self::Float,
            "double" => Self::Double,
            "char" => Self::Char,
            "wchar" => Self::WChar,
            "dchar" => Self::DChar,
            "object" => Self::Object,
            "stream" => Self::Stream,
            "GenericDelegate" => Self::Delegate,
            "GenericFunction" => Self::Function,
            "invalid" => Self::Invalid,
            _ => return None,
        })
    }

    /// Parses a kind back from its numeric discriminant, as used by the JSON
    /// codec's `type` field.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Bool,
            1 => Self::Byte,
            2 => Self::UByte,
            3 => Self::Short,
            4 => Self::UShort,
            5 => Self::Int,
            6 => Self::UInt,
            7 => Self::Long,
            8 => Self::ULong,
            9 => Self::Float,
            10 => Self::Double,
            11 => Self::Char,
            12 => Self::WChar,
            13 => Self::DChar,
            14 => Self::Object,
            15 => Self::Stream,
            16 => Self::Delegate,
            17 => Self::Function,
            18 => Self::Invalid,
            _ => return None,
        })
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `(kind, is_array)`, carried by every descriptor and every IST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rtti {
    pub kind: Kind,
    pub is_array: bool,
}

impl Rtti {
    #[must_use]
    pub const fn new(kind: Kind, is_array: bool) -> Self {
        Self { kind, is_array }
    }

    #[must_use]
    pub const fn scalar(kind: Kind) -> Self {
        Self::new(kind, false)
    }

    #[must_use]
    pub const fn array(kind: Kind) -> Self {
        Self::new(kind, true)
    }

    #[must_use]
    pub const fn invalid() -> Self {
        Self::scalar(Kind::Invalid)
    }
}

impl fmt::Display for Rtti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if self.is_array {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trips_through_from_name() {
        for kind in [
            Kind::Bool,
            Kind::Byte,
            Kind::UByte,
            Kind::Short,
            Kind::UShort,
            Kind::Int,
            Kind::UInt,
            Kind::Long,
            Kind::ULong,
            Kind::Float,
            Kind::Double,
            Kind::Char,
            Kind::WChar,
            Kind::DChar,
            Kind::Object,
            Kind::Stream,
            Kind::Delegate,
            Kind::Function,
            Kind::Invalid,
        ] {
            assert_eq!(Kind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn fat_pointer_names_have_no_whitespace() {
        assert!(!Kind::Delegate.name().contains(' '));
        assert!(!Kind::Function.name().contains(' '));
    }

    #[test]
    fn element_size_matches_primitive_width() {
        assert_eq!(Kind::Byte.element_size(), Some(1));
        assert_eq!(Kind::Int.element_size(), Some(4));
        assert_eq!(Kind::Double.element_size(), Some(8));
        assert_eq!(Kind::Object.element_size(), None);
    }
}
