//! The erased payload carried by a [`Descriptor`](crate::descriptor::Descriptor)
//! getter/setter and by a [`SerNodeInfo`](crate::node::SerNodeInfo) once decoded.

use crate::error::{Error, Result};
use crate::rtti::{Kind, Rtti};

/// A single scalar primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Byte(i8),
    UByte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    Char(char),
    WChar(u16),
    DChar(char),
}

impl Scalar {
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Bool(_) => Kind::Bool,
            Self::Byte(_) => Kind::Byte,
            Self::UByte(_) => Kind::UByte,
            Self::Short(_) => Kind::Short,
            Self::UShort(_) => Kind::UShort,
            Self::Int(_) => Kind::Int,
            Self::UInt(_) => Kind::UInt,
            Self::Long(_) => Kind::Long,
            Self::ULong(_) => Kind::ULong,
            Self::Float(_) => Kind::Float,
            Self::Double(_) => Kind::Double,
            Self::Char(_) => Kind::Char,
            Self::WChar(_) => Kind::WChar,
            Self::DChar(_) => Kind::DChar,
        }
    }
}

/// A homogeneous array of one primitive kind.
///
/// Character arrays get their own variants since their wire encoding is a
/// run of code units/points rather than fixed-size elements boxed
/// individually (base spec §3: "for an array, the bytes are the
/// concatenation of fixed-size elements, or the UTF-8/16/32 code units for
/// character arrays").
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Bool(Vec<bool>),
    Byte(Vec<i8>),
    UByte(Vec<u8>),
    Short(Vec<i16>),
    UShort(Vec<u16>),
    Int(Vec<i32>),
    UInt(Vec<u32>),
    Long(Vec<i64>),
    ULong(Vec<u64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    /// UTF-8 text, one "element" per `char`.
    Char(String),
    /// UTF-16 code units (not necessarily valid UTF-16 on their own, as with
    /// any `wchar` array allowing unpaired surrogates).
    WChar(Vec<u16>),
    /// UTF-32 code points.
    DChar(Vec<char>),
}

impl ArrayValue {
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Bool(_) => Kind::Bool,
            Self::Byte(_) => Kind::Byte,
            Self::UByte(_) => Kind::UByte,
            Self::Short(_) => Kind::Short,
            Self::UShort(_) => Kind::UShort,
            Self::Int(_) => Kind::Int,
            Self::UInt(_) => Kind::UInt,
            Self::Long(_) => Kind::Long,
            Self::ULong(_) => Kind::ULong,
            Self::Float(_) => Kind::Float,
            Self::Double(_) => Kind::Double,
            Self::Char(_) => Kind::Char,
            Self::WChar(_) => Kind::WChar,
            Self::DChar(_) => Kind::DChar,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Byte(v) => v.len(),
            Self::UByte(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::UShort(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::UInt(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::ULong(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Char(v) => v.chars().count(),
            Self::WChar(v) => v.len(),
            Self::DChar(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Any value a [`Descriptor`](crate::descriptor::Descriptor) can carry
/// across its getter/setter, excluding owned sub-objects (those are
/// reached through [`Publisher::read_object`](crate::publisher::Publisher::read_object)
/// instead, since they need a borrow of the live sub-object rather than a
/// detached value).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Array(ArrayValue),
    /// Raw bytes for a `stream`-kind property.
    Stream(Vec<u8>),
    /// A delegate/function fat pointer, carried solely by its registry id.
    FatPointer(String),
}

impl Value {
    #[must_use]
    pub fn rtti(&self) -> Rtti {
        match self {
            Self::Scalar(s) => Rtti::scalar(s.kind()),
            Self::Array(a) => Rtti::array(a.kind()),
            Self::Stream(_) => Rtti::scalar(Kind::Stream),
            Self::FatPointer(_) => Rtti::scalar(Kind::Delegate),
        }
    }

    /// Encodes this value into the codec-agnostic, host-endian byte form a
    /// [`SerNodeInfo`](crate::node::SerNodeInfo) stores. Every codec
    /// transcodes between this and its own wire representation, which is
    /// what lets format conversion skip descriptors entirely.
    #[must_use]
    pub fn to_host_bytes(&self) -> Vec<u8> {
        match self {
            Self::Scalar(s) => scalar_to_host_bytes(s),
            Self::Array(a) => array_to_host_bytes(a),
            Self::Stream(bytes) => bytes.clone(),
            Self::FatPointer(id) => id.clone().into_bytes(),
        }
    }

    /// Inverse of [`Self::to_host_bytes`], guided by `rtti` to know the
    /// shape of `bytes`.
    pub fn from_host_bytes(rtti: Rtti, bytes: &[u8]) -> Result<Self> {
        if rtti.kind.is_fat_pointer() {
            let id = String::from_utf8(bytes.to_vec())
                .map_err(|_| Error::InvalidValue(rtti))?;
            return Ok(Self::FatPointer(id));
        }
        if rtti.kind == Kind::Stream {
            return Ok(Self::Stream(bytes.to_vec()));
        }

        if rtti.is_array {
            array_from_host_bytes(rtti.kind, bytes).map(Self::Array)
        } else {
            scalar_from_host_bytes(rtti.kind, bytes).map(Self::Scalar)
        }
    }
}

fn scalar_to_host_bytes(scalar: &Scalar) -> Vec<u8> {
    match *scalar {
        Scalar::Bool(v) => vec![u8::from(v)],
        Scalar::Byte(v) => vec![v.to_ne_bytes()[0]],
        Scalar::UByte(v) => vec![v],
        Scalar::Short(v) => v.to_ne_bytes().to_vec(),
        Scalar::UShort(v) => v.to_ne_bytes().to_vec(),
        Scalar::Int(v) => v.to_ne_bytes().to_vec(),
        Scalar::UInt(v) => v.to_ne_bytes().to_vec(),
        Scalar::Long(v) => v.to_ne_bytes().to_vec(),
        Scalar::ULong(v) => v.to_ne_bytes().to_vec(),
        Scalar::Float(v) => v.to_ne_bytes().to_vec(),
        Scalar::Double(v) => v.to_ne_bytes().to_vec(),
        Scalar::Char(v) => (v as u32).to_ne_bytes().to_vec(),
        Scalar::WChar(v) => v.to_ne_bytes().to_vec(),
        Scalar::DChar(v) => (v as u32).to_ne_bytes().to_vec(),
    }
}

fn scalar_from_host_bytes(kind: Kind, bytes: &[u8]) -> Result<Scalar> {
    let rtti = Rtti::scalar(kind);
    macro_rules! take {
        ($n:expr) => {{
            let arr: [u8; $n] = bytes.try_into().map_err(|_| Error::InvalidValue(rtti))?;
            arr
        }};
    }
    Ok(match kind {
        Kind::Bool => Scalar::Bool(*bytes.first().ok_or(Error::InvalidValue(rtti))? != 0),
        Kind::Byte => Scalar::Byte(take!(1)[0] as i8),
        Kind::UByte => Scalar::UByte(take!(1)[0]),
        Kind::Short => Scalar::Short(i16::from_ne_bytes(take!(2))),
        Kind::UShort => Scalar::UShort(u16::from_ne_bytes(take!(2))),
        Kind::Int => Scalar::Int(i32::from_ne_bytes(take!(4))),
        Kind::UInt => Scalar::UInt(u32::from_ne_bytes(take!(4))),
        Kind::Long => Scalar::Long(i64::from_ne_bytes(take!(8))),
        Kind::ULong => Scalar::ULong(u64::from_ne_bytes(take!(8))),
        Kind::Float => Scalar::Float(f32::from_ne_bytes(take!(4))),
        Kind::Double => Scalar::Double(f64::from_ne_bytes(take!(8))),
        Kind::Char => {
            Scalar::Char(char::from_u32(u32::from_ne_bytes(take!(4))).ok_or(Error::InvalidValue(rtti))?)
        },
        Kind::WChar => Scalar::WChar(u16::from_ne_bytes(take!(2))),
        Kind::DChar => {
            Scalar::DChar(char::from_u32(u32::from_ne_bytes(take!(4))).ok_or(Error::InvalidValue(rtti))?)
        },
        Kind::Object | Kind::Stream | Kind::Delegate | Kind::Function | Kind::Invalid => {
            return Err(Error::InvalidValue(rtti));
        },
    })
}

fn array_to_host_bytes(array: &ArrayValue) -> Vec<u8> {
    match array {
        ArrayValue::Bool(v) => v.iter().map(|&b| u8::from(b)).collect(),
        ArrayValue::Byte(v) => v.iter().map(|&b| b.to_ne_bytes()[0]).collect(),
        ArrayValue::UByte(v) => v.clone(),
        ArrayValue::Short(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
        ArrayValue::UShort(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
        ArrayValue::Int(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
        ArrayValue::UInt(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
        ArrayValue::Long(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
        ArrayValue::ULong(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
        ArrayValue::Float(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
        ArrayValue::Double(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
        ArrayValue::Char(s) => s.as_bytes().to_vec(),
        ArrayValue::WChar(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
        ArrayValue::DChar(v) => v.iter().flat_map(|&c| (c as u32).to_ne_bytes()).collect(),
    }
}

fn array_from_host_bytes(kind: Kind, bytes: &[u8]) -> Result<ArrayValue> {
    let rtti = Rtti::array(kind);
    macro_rules! chunks {
        ($n:expr, $from:expr, $variant:ident) => {{
            let mut out = Vec::with_capacity(bytes.len() / $n);
            for chunk in bytes.chunks_exact($n) {
                let arr: [u8; $n] = chunk.try_into().expect("chunks_exact guarantees length");
                out.push($from(arr));
            }
            if bytes.len() % $n != 0 {
                return Err(Error::InvalidValue(rtti));
            }
            ArrayValue::$variant(out)
        }};
    }
    Ok(match kind {
        Kind::Bool => ArrayValue::Bool(bytes.iter().map(|&b| b != 0).collect()),
        Kind::Byte => ArrayValue::Byte(bytes.iter().map(|&b| b as i8).collect()),
        Kind::UByte => ArrayValue::UByte(bytes.to_vec()),
        Kind::Short => chunks!(2, i16::from_ne_bytes, Short),
        Kind::UShort => chunks!(2, u16::from_ne_bytes, UShort),
        Kind::Int => chunks!(4, i32::from_ne_bytes, Int),
        Kind::UInt => chunks!(4, u32::from_ne_bytes, UInt),
        Kind::Long => chunks!(8, i64::from_ne_bytes, Long),
        Kind::ULong => chunks!(8, u64::from_ne_bytes, ULong),
        Kind::Float => chunks!(4, f32::from_ne_bytes, Float),
        Kind::Double => chunks!(8, f64::from_ne_bytes, Double),
        Kind::Char => {
            ArrayValue::Char(String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidValue(rtti))?)
        },
        Kind::WChar => chunks!(2, u16::from_ne_bytes, WChar),
        Kind::DChar => {
            let mut out = Vec::with_capacity(bytes.len() / 4);
            for chunk in bytes.chunks_exact(4) {
                let arr: [u8; 4] = chunk.try_into().expect("chunks_exact guarantees length");
                out.push(char::from_u32(u32::from_ne_bytes(arr)).ok_or(Error::InvalidValue(rtti))?);
            }
            if bytes.len() % 4 != 0 {
                return Err(Error::InvalidValue(rtti));
            }
            ArrayValue::DChar(out)
        },
        Kind::Object | Kind::Stream | Kind::Delegate | Kind::Function | Kind::Invalid => {
            return Err(Error::InvalidValue(rtti));
        },
    })
}

/// Implemented once per native Rust type that maps onto a [`Kind`].
///
/// The `#[derive(Publish)]` macro requires this bound on every plain
/// value-kind field; it is what lets a [`Descriptor`](crate::descriptor::Descriptor)
/// recover a concrete Rust value from the RTTI-tagged, type-erased [`Value`].
pub trait PropertyValue: Sized + Clone + PartialEq {
    const RTTI: Rtti;

    fn into_value(self) -> Value;
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! impl_scalar_property_value {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl PropertyValue for $ty {
            const RTTI: Rtti = Rtti::scalar(Kind::$kind);

            fn into_value(self) -> Value {
                Value::Scalar(Scalar::$variant(self))
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Scalar(Scalar::$variant(v)) => Ok(v),
                    other => Err(Error::InvalidValue(other.rtti())),
                }
            }
        }
    };
}

impl_scalar_property_value!(bool, Bool, Bool);
impl_scalar_property_value!(i8, Byte, Byte);
impl_scalar_property_value!(u8, UByte, UByte);
impl_scalar_property_value!(i16, Short, Short);
impl_scalar_property_value!(u16, UShort, UShort);
impl_scalar_property_value!(i32, Int, Int);
impl_scalar_property_value!(u32, UInt, UInt);
impl_scalar_property_value!(i64, Long, Long);
impl_scalar_property_value!(u64, ULong, ULong);
impl_scalar_property_value!(f32, Float, Float);
impl_scalar_property_value!(f64, Double, Double);
impl_scalar_property_value!(char, Char, Char);

macro_rules! impl_array_property_value {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl PropertyValue for Vec<$ty> {
            const RTTI: Rtti = Rtti::array(Kind::$kind);

            fn into_value(self) -> Value {
                Value::Array(ArrayValue::$variant(self))
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Array(ArrayValue::$variant(v)) => Ok(v),
                    other => Err(Error::InvalidValue(other.rtti())),
                }
            }
        }
    };
}

impl_array_property_value!(bool, Bool, Bool);
impl_array_property_value!(i8, Byte, Byte);
impl_array_property_value!(u8, UByte, UByte);
impl_array_property_value!(i16, Short, Short);
impl_array_property_value!(u16, UShort, UShort);
impl_array_property_value!(i32, Int, Int);
impl_array_property_value!(u32, UInt, UInt);
impl_array_property_value!(i64, Long, Long);
impl_array_property_value!(u64, ULong, ULong);
impl_array_property_value!(f32, Float, Float);
impl_array_property_value!(f64, Double, Double);
impl_array_property_value!(char, DChar, DChar);

impl PropertyValue for String {
    const RTTI: Rtti = Rtti::array(Kind::Char);

    fn into_value(self) -> Value {
        Value::Array(ArrayValue::Char(self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(ArrayValue::Char(v)) => Ok(v),
            other => Err(Error::InvalidValue(other.rtti())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_value() {
        assert_eq!(i32::from_value(42i32.into_value()).unwrap(), 42);
        assert_eq!(
            String::from_value("hi".to_owned().into_value()).unwrap(),
            "hi"
        );
        assert_eq!(
            Vec::<u32>::from_value(vec![1u32, 2, 3].into_value()).unwrap(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let v = 42i32.into_value();
        assert!(String::from_value(v).is_err());
    }

    #[test]
    fn host_bytes_round_trip_scalar_and_array() {
        let v = 1234i32.into_value();
        let bytes = v.to_host_bytes();
        assert_eq!(Value::from_host_bytes(v.rtti(), &bytes).unwrap(), v);

        let v = vec![1u32, 2, 3].into_value();
        let bytes = v.to_host_bytes();
        assert_eq!(Value::from_host_bytes(v.rtti(), &bytes).unwrap(), v);

        let v = "héllo".to_owned().into_value();
        let bytes = v.to_host_bytes();
        assert_eq!(Value::from_host_bytes(v.rtti(), &bytes).unwrap(), v);
    }

    #[test]
    fn host_bytes_round_trip_stream_and_fat_pointer() {
        let v = Value::Stream(vec![9, 8, 7]);
        let bytes = v.to_host_bytes();
        assert_eq!(Value::from_host_bytes(v.rtti(), &bytes).unwrap(), v);

        let v = Value::FatPointer("entry_3".to_owned());
        let bytes = v.to_host_bytes();
        assert_eq!(Value::from_host_bytes(v.rtti(), &bytes).unwrap(), v);
    }

    #[test]
    fn malformed_array_length_is_rejected() {
        let rtti = Rtti::array(Kind::Int);
        assert!(Value::from_host_bytes(rtti, &[0, 1, 2]).is_err());
    }
}
