//! Line-oriented text codec: one property per line, tab-indented by depth.
//!
//! ```text
//! <TAB x level><type-name>[<array-suffix>] <name> = "<value>"
//! ```

use std::io::{Read, Write};

use super::Codec;
use crate::error::{Error, Result};
use crate::node::SerNodeInfo;
use crate::rtti::{Kind, Rtti};
use crate::stream::Stream;
use crate::value::{ArrayValue, Scalar, Value};

/// Implements base spec §4.F "Text codec".
pub struct TextCodec;

impl Codec for TextCodec {
    fn write(&self, node: &SerNodeInfo, stream: &mut dyn Stream) -> Result<()> {
        let suffix = if node.rtti.is_array { "[]" } else { "" };
        let value = format_value(node.rtti, &node.value)?;
        let line = format!(
            "{}{}{} {} = \"{}\"\n",
            "\t".repeat(node.level as usize),
            node.rtti.kind.name(),
            suffix,
            node.name,
            escape(&value),
        );
        stream.write_all(line.as_bytes())?;
        Ok(())
    }

    fn read(&self, stream: &mut dyn Stream) -> Result<Option<SerNodeInfo>> {
        let Some(line) = read_line(stream)? else {
            return Ok(None);
        };
        Ok(Some(parse_line(&line).unwrap_or_else(|_| {
            SerNodeInfo::damaged(Rtti::invalid(), 0, "")
        })))
    }
}

/// Reads bytes up to and including the next raw `\n` byte.
///
/// `escape`/`unescape` always turn a literal newline in a value into the
/// two-character sequence `\n`, so a raw `\n` byte never occurs inside a
/// value and unambiguously ends the line — even one with no closing quote,
/// which keeps a malformed line from swallowing the line after it.
/// Returns `Ok(None)` if the stream is already exhausted.
fn read_line(stream: &mut dyn Stream) -> Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte)?;
        if n == 0 {
            return Ok((!buf.is_empty()).then_some(buf));
        }
        buf.push(byte[0]);
        if byte[0] == b'\n' {
            return Ok(Some(buf));
        }
    }
}

fn parse_line(raw: &[u8]) -> Result<SerNodeInfo> {
    let text = String::from_utf8(raw.to_vec()).map_err(|e| Error::MalformedFrame {
        codec: "text",
        reason: e.to_string(),
    })?;
    let text = text.strip_suffix('\n').unwrap_or(&text);

    let level = u32::try_from(text.len() - text.trim_start_matches('\t').len())
        .map_err(|_| Error::MalformedFrame { codec: "text", reason: "level overflow".into() })?;
    let rest = text.trim_start_matches('\t');

    let marker = " = \"";
    let marker_at = rest.find(marker).ok_or_else(|| Error::MalformedFrame {
        codec: "text",
        reason: "missing ` = \"` marker".into(),
    })?;
    let header = &rest[..marker_at];
    let quoted = &rest[marker_at + marker.len()..];
    let escaped_value = quoted.strip_suffix('"').ok_or_else(|| Error::MalformedFrame {
        codec: "text",
        reason: "missing closing quote".into(),
    })?;

    let space_at = header.find(' ').ok_or_else(|| Error::MalformedFrame {
        codec: "text",
        reason: "missing type/name separator".into(),
    })?;
    let type_token = &header[..space_at];
    let name = &header[space_at + 1..];
    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '?') {
        return Err(Error::MalformedFrame {
            codec: "text",
            reason: format!("invalid name token {name:?}"),
        });
    }

    let (type_name, is_array) = match type_token.strip_suffix("[]") {
        Some(base) => (base, true),
        None => (type_token, false),
    };
    let kind = Kind::from_name(type_name).ok_or_else(|| Error::MalformedFrame {
        codec: "text",
        reason: format!("unknown type name {type_name}"),
    })?;
    let rtti = Rtti::new(kind, is_array);

    let value_str = unescape(escaped_value);
    let bytes = parse_value(rtti, &value_str)?;

    Ok(SerNodeInfo::new(rtti, level, name, bytes))
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                },
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

pub(super) fn format_value(rtti: Rtti, bytes: &[u8]) -> Result<String> {
    if rtti.kind == Kind::Object {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }

    Ok(match Value::from_host_bytes(rtti, bytes)? {
        Value::Scalar(Scalar::Bool(v)) => v.to_string(),
        Value::Scalar(Scalar::Byte(v)) => v.to_string(),
        Value::Scalar(Scalar::UByte(v)) => v.to_string(),
        Value::Scalar(Scalar::Short(v)) => v.to_string(),
        Value::Scalar(Scalar::UShort(v)) => v.to_string(),
        Value::Scalar(Scalar::Int(v)) => v.to_string(),
        Value::Scalar(Scalar::UInt(v)) => v.to_string(),
        Value::Scalar(Scalar::Long(v)) => v.to_string(),
        Value::Scalar(Scalar::ULong(v)) => v.to_string(),
        Value::Scalar(Scalar::Float(v)) => v.to_string(),
        Value::Scalar(Scalar::Double(v)) => v.to_string(),
        Value::Scalar(Scalar::Char(v)) => v.to_string(),
        Value::Scalar(Scalar::WChar(v)) => v.to_string(),
        Value::Scalar(Scalar::DChar(v)) => v.to_string(),
        Value::Array(ArrayValue::Char(s)) => s,
        Value::Array(ArrayValue::WChar(units)) => String::from_utf16_lossy(&units),
        Value::Array(ArrayValue::DChar(chars)) => chars.into_iter().collect(),
        Value::Array(ArrayValue::Bool(v)) => join(&v),
        Value::Array(ArrayValue::Byte(v)) => join(&v),
        Value::Array(ArrayValue::UByte(v)) => join(&v),
        Value::Array(ArrayValue::Short(v)) => join(&v),
        Value::Array(ArrayValue::UShort(v)) => join(&v),
        Value::Array(ArrayValue::Int(v)) => join(&v),
        Value::Array(ArrayValue::UInt(v)) => join(&v),
        Value::Array(ArrayValue::Long(v)) => join(&v),
        Value::Array(ArrayValue::ULong(v)) => join(&v),
        Value::Array(ArrayValue::Float(v)) => join(&v),
        Value::Array(ArrayValue::Double(v)) => join(&v),
        Value::Stream(bytes) => hex_encode(&bytes),
        Value::FatPointer(id) => id,
    })
}

pub(super) fn parse_value(rtti: Rtti, s: &str) -> Result<Vec<u8>> {
    if rtti.kind == Kind::Object {
        return Ok(s.as_bytes().to_vec());
    }
    if rtti.kind == Kind::Stream {
        return Ok(Value::Stream(hex_decode(s)?).to_host_bytes());
    }
    if rtti.kind.is_fat_pointer() {
        return Ok(Value::FatPointer(s.to_owned()).to_host_bytes());
    }

    let invalid = || Error::InvalidValue(rtti);
    let value = if rtti.is_array {
        match rtti.kind {
            Kind::Char => Value::Array(ArrayValue::Char(s.to_owned())),
            Kind::WChar => Value::Array(ArrayValue::WChar(s.encode_utf16().collect())),
            Kind::DChar => Value::Array(ArrayValue::DChar(s.chars().collect())),
            Kind::Bool => Value::Array(ArrayValue::Bool(parse_list(s)?)),
            Kind::Byte => Value::Array(ArrayValue::Byte(parse_list(s)?)),
            Kind::UByte => Value::Array(ArrayValue::UByte(parse_list(s)?)),
            Kind::Short => Value::Array(ArrayValue::Short(parse_list(s)?)),
            Kind::UShort => Value::Array(ArrayValue::UShort(parse_list(s)?)),
            Kind::Int => Value::Array(ArrayValue::Int(parse_list(s)?)),
            Kind::UInt => Value::Array(ArrayValue::UInt(parse_list(s)?)),
            Kind::Long => Value::Array(ArrayValue::Long(parse_list(s)?)),
            Kind::ULong => Value::Array(ArrayValue::ULong(parse_list(s)?)),
            Kind::Float => Value::Array(ArrayValue::Float(parse_list(s)?)),
            Kind::Double => Value::Array(ArrayValue::Double(parse_list(s)?)),
            _ => return Err(invalid()),
        }
    } else {
        match rtti.kind {
            Kind::Bool => Value::Scalar(Scalar::Bool(s.parse().map_err(|_| invalid())?)),
            Kind::Byte => Value::Scalar(Scalar::Byte(s.parse().map_err(|_| invalid())?)),
            Kind::UByte => Value::Scalar(Scalar::UByte(s.parse().map_err(|_| invalid())?)),
            Kind::Short => Value::Scalar(Scalar::Short(s.parse().map_err(|_| invalid())?)),
            Kind::UShort => Value::Scalar(Scalar::UShort(s.parse().map_err(|_| invalid())?)),
            Kind::Int => Value::Scalar(Scalar::Int(s.parse().map_err(|_| invalid())?)),
            Kind::UInt => Value::Scalar(Scalar::UInt(s.parse().map_err(|_| invalid())?)),
            Kind::Long => Value::Scalar(Scalar::Long(s.parse().map_err(|_| invalid())?)),
            Kind::ULong => Value::Scalar(Scalar::ULong(s.parse().map_err(|_| invalid())?)),
            Kind::Float => Value::Scalar(Scalar::Float(s.parse().map_err(|_| invalid())?)),
            Kind::Double => Value::Scalar(Scalar::Double(s.parse().map_err(|_| invalid())?)),
            Kind::Char => Value::Scalar(Scalar::Char(s.chars().next().ok_or_else(invalid)?)),
            Kind::WChar => Value::Scalar(Scalar::WChar(s.parse().map_err(|_| invalid())?)),
            Kind::DChar => Value::Scalar(Scalar::DChar(s.chars().next().ok_or_else(invalid)?)),
            _ => return Err(invalid()),
        }
    };
    Ok(value.to_host_bytes())
}

fn join<T: ToString>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

fn parse_list<T: std::str::FromStr>(s: &str) -> Result<Vec<T>> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|part| part.parse().map_err(|_| Error::custom(format!("bad list element {part:?}"))))
        .collect()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Result<Vec<u8>> {
    if s.len() % 2 != 0 {
        return Err(Error::custom("odd-length hex stream value"));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| Error::custom("invalid hex digit")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    #[test]
    fn round_trips_scalar_uint() {
        let mut mem = MemoryStream::new();
        let node = SerNodeInfo::new(Rtti::scalar(Kind::UInt), 1, "a", 67_305_985u32.to_ne_bytes().to_vec());
        TextCodec.write(&node, &mut mem).unwrap();

        mem.set_position(0).unwrap();
        let line = String::from_utf8(mem.clone().into_vec()).unwrap();
        assert_eq!(line, "\tuint a = \"67305985\"\n");

        let read = TextCodec.read(&mut mem).unwrap().unwrap();
        assert_eq!(read, node);
    }

    #[test]
    fn round_trips_char_array_with_escaping() {
        let mut mem = MemoryStream::new();
        let value = Value::Array(ArrayValue::Char("line one\nsays \"hi\"".to_owned()));
        let node = SerNodeInfo::new(Rtti::array(Kind::Char), 2, "text", value.to_host_bytes());
        TextCodec.write(&node, &mut mem).unwrap();

        mem.set_position(0).unwrap();
        let read = TextCodec.read(&mut mem).unwrap().unwrap();
        assert_eq!(read, node);
    }

    #[test]
    fn malformed_line_is_damaged_and_does_not_abort() {
        let mut mem = MemoryStream::new();
        mem.write_all(b"not a valid line\n").unwrap();
        let good = SerNodeInfo::new(Rtti::scalar(Kind::Int), 0, "n", 12i32.to_ne_bytes().to_vec());
        TextCodec.write(&good, &mut mem).unwrap();

        mem.set_position(0).unwrap();
        let first = TextCodec.read(&mut mem).unwrap().unwrap();
        assert!(first.is_damaged);
        let second = TextCodec.read(&mut mem).unwrap().unwrap();
        assert_eq!(second, good);
    }

    #[test]
    fn name_with_embedded_question_mark_is_damaged() {
        let mut mem = MemoryStream::new();
        mem.write_all(b"int ??? = \"12\"\n").unwrap();

        mem.set_position(0).unwrap();
        let read = TextCodec.read(&mut mem).unwrap().unwrap();
        assert!(read.is_damaged);
    }

    #[test]
    fn object_value_is_the_class_name() {
        let mut mem = MemoryStream::new();
        let node = SerNodeInfo::new(Rtti::scalar(Kind::Object), 0, "root", b"Widget".to_vec());
        TextCodec.write(&node, &mut mem).unwrap();

        mem.set_position(0).unwrap();
        let read = TextCodec.read(&mut mem).unwrap().unwrap();
        assert_eq!(read, node);
    }
}
