//! JSON-per-node codec: one object per node, concatenated without a
//! surrounding array, read back via bracket-balanced slurping.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use super::Codec;
use super::text::{format_value, parse_value};
use crate::error::{Error, Result};
use crate::node::SerNodeInfo;
use crate::rtti::{Kind, Rtti};
use crate::stream::Stream;

#[derive(Serialize, Deserialize)]
struct JsonNode {
    level: u32,
    #[serde(rename = "type")]
    type_: u8,
    name: String,
    isarray: u8,
    value: String,
}

/// Implements base spec §4.F "JSON codec". `pretty` toggles multi-line
/// indented output; the reader accepts both forms regardless.
#[derive(Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    #[must_use]
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Codec for JsonCodec {
    fn write(&self, node: &SerNodeInfo, stream: &mut dyn Stream) -> Result<()> {
        let value = format_value(node.rtti, &node.value)?;
        let json_node = JsonNode {
            level: node.level,
            type_: node.rtti.kind as u8,
            name: node.name.clone(),
            isarray: u8::from(node.rtti.is_array),
            value,
        };

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&json_node)
        } else {
            serde_json::to_string(&json_node)
        }
        .map_err(|e| Error::custom(e.to_string()))?;

        stream.write_all(rendered.as_bytes())?;
        stream.write_all(b"\n")?;
        Ok(())
    }

    fn read(&self, stream: &mut dyn Stream) -> Result<Option<SerNodeInfo>> {
        let Some(raw) = slurp_one_object(stream)? else {
            return Ok(None);
        };
        Ok(Some(parse_object(&raw).unwrap_or_else(|_| {
            SerNodeInfo::damaged(Rtti::invalid(), 0, "")
        })))
    }
}

fn parse_object(raw: &[u8]) -> Result<SerNodeInfo> {
    let json_node: JsonNode = serde_json::from_slice(raw).map_err(|e| Error::MalformedFrame {
        codec: "json",
        reason: e.to_string(),
    })?;

    let kind = Kind::from_u8(json_node.type_).ok_or_else(|| Error::MalformedFrame {
        codec: "json",
        reason: format!("unknown type value {}", json_node.type_),
    })?;
    let rtti = Rtti::new(kind, json_node.isarray != 0);
    let bytes = parse_value(rtti, &json_node.value)?;

    Ok(SerNodeInfo::new(rtti, json_node.level, json_node.name, bytes))
}

/// Reads forward, skipping whitespace, until one balanced `{...}` object is
/// consumed (respecting string literals and escapes), or `Ok(None)` if the
/// stream has nothing left but whitespace.
fn slurp_one_object(stream: &mut dyn Stream) -> Result<Option<Vec<u8>>> {
    let mut byte = [0u8; 1];

    // skip leading whitespace
    let first = loop {
        if stream.read(&mut byte)? == 0 {
            return Ok(None);
        }
        if !byte[0].is_ascii_whitespace() {
            break byte[0];
        }
    };
    if first != b'{' {
        return Err(Error::MalformedFrame {
            codec: "json",
            reason: format!("expected '{{', found {first:#x}"),
        });
    }

    let mut buf = vec![first];
    let mut depth = 1i32;
    let mut in_string = false;
    let mut escaped = false;

    while depth > 0 {
        if stream.read(&mut byte)? == 0 {
            return Err(Error::MalformedFrame {
                codec: "json",
                reason: "unterminated object".into(),
            });
        }
        let b = byte[0];
        buf.push(b);

        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => depth -= 1,
            _ => {},
        }
    }

    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    #[test]
    fn round_trips_a_scalar_node() {
        let mut mem = MemoryStream::new();
        let node = SerNodeInfo::new(Rtti::scalar(Kind::Int), 2, "count", 9i32.to_ne_bytes().to_vec());
        JsonCodec::default().write(&node, &mut mem).unwrap();

        mem.set_position(0).unwrap();
        let read = JsonCodec::default().read(&mut mem).unwrap().unwrap();
        assert_eq!(read, node);
    }

    #[test]
    fn handles_braces_inside_string_values() {
        let mut mem = MemoryStream::new();
        let value = crate::value::Value::Array(crate::value::ArrayValue::Char("a{b}c".to_owned()));
        let node = SerNodeInfo::new(Rtti::array(Kind::Char), 0, "s", value.to_host_bytes());
        JsonCodec::default().write(&node, &mut mem).unwrap();

        mem.set_position(0).unwrap();
        let read = JsonCodec::default().read(&mut mem).unwrap().unwrap();
        assert_eq!(read, node);
    }

    #[test]
    fn pretty_output_still_parses() {
        let mut mem = MemoryStream::new();
        let node = SerNodeInfo::new(Rtti::scalar(Kind::Bool), 0, "flag", vec![1]);
        JsonCodec::pretty().write(&node, &mut mem).unwrap();

        mem.set_position(0).unwrap();
        let read = JsonCodec::default().read(&mut mem).unwrap().unwrap();
        assert_eq!(read, node);
    }

    #[test]
    fn end_of_stream_returns_none() {
        let mut mem = MemoryStream::new();
        assert!(JsonCodec::default().read(&mut mem).unwrap().is_none());
    }
}
