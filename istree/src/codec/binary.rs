//! Length-prefixed binary codec: `[0x99][le_u32 level][u8 type][u8 is_array]
//! [le_u32 name_len][name][le_u32 value_len][value][0xA0]`.

use std::io::{Read, Write};

use super::Codec;
use crate::error::{Error, Result};
use crate::node::SerNodeInfo;
use crate::rtti::{Kind, Rtti};
use crate::stream::Stream;

const FRAME_START: u8 = 0x99;
const FRAME_END: u8 = 0xA0;

/// Element size to byte-swap by when normalizing host-endian value bytes to
/// the wire's little-endian form, or `None` if the value's bytes are not a
/// run of fixed-size numeric elements (UTF-8 text, raw stream bytes, class
/// names, reference ids).
fn swap_element_size(rtti: Rtti) -> Option<usize> {
    if rtti.kind == Kind::Char && rtti.is_array {
        return None;
    }
    match rtti.kind.element_size() {
        Some(1) | None => None,
        Some(n) => Some(n),
    }
}

/// Byte-swap is its own inverse, so this is used both when writing (host ->
/// little-endian) and reading (little-endian -> host).
fn swap_endian(bytes: &[u8], element_size: Option<usize>) -> Vec<u8> {
    let Some(n) = element_size else {
        return bytes.to_vec();
    };
    if cfg!(target_endian = "little") {
        return bytes.to_vec();
    }
    bytes
        .chunks_exact(n)
        .flat_map(|chunk| chunk.iter().rev().copied())
        .collect()
}

/// Implements base spec §4.F "Binary codec".
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn write(&self, node: &SerNodeInfo, stream: &mut dyn Stream) -> Result<()> {
        let name_bytes = node.name.as_bytes();
        let wire_value = swap_endian(&node.value, swap_element_size(node.rtti));

        stream.write_all(&[FRAME_START])?;
        stream.write_all(&node.level.to_le_bytes())?;
        stream.write_all(&[node.rtti.kind as u8])?;
        stream.write_all(&[u8::from(node.rtti.is_array)])?;
        stream.write_all(&u32_len(name_bytes.len())?.to_le_bytes())?;
        stream.write_all(name_bytes)?;
        stream.write_all(&u32_len(wire_value.len())?.to_le_bytes())?;
        stream.write_all(&wire_value)?;
        stream.write_all(&[FRAME_END])?;
        Ok(())
    }

    fn read(&self, stream: &mut dyn Stream) -> Result<Option<SerNodeInfo>> {
        if !seek_to_frame_start(stream)? {
            return Ok(None);
        }

        match read_frame_body(stream) {
            Ok(node) => Ok(Some(node)),
            Err(_) => Ok(Some(SerNodeInfo::damaged(Rtti::invalid(), 0, ""))),
        }
    }
}

fn u32_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::LengthOverflow(len))
}

/// Advances the stream past noise until a `0x99` byte is consumed, or
/// returns `false` at end of stream (base spec §4.F "tolerating noise
/// between frames").
fn seek_to_frame_start(stream: &mut dyn Stream) -> Result<bool> {
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte)?;
        if n == 0 {
            return Ok(false);
        }
        if byte[0] == FRAME_START {
            return Ok(true);
        }
    }
}

fn read_frame_body(stream: &mut dyn Stream) -> Result<SerNodeInfo> {
    let level = read_u32(stream)?;
    let kind_byte = read_u8(stream)?;
    let kind = Kind::from_u8(kind_byte).ok_or_else(|| Error::MalformedFrame {
        codec: "binary",
        reason: format!("unknown type byte {kind_byte}"),
    })?;
    let is_array = read_u8(stream)? != 0;
    let rtti = Rtti::new(kind, is_array);

    let name_len = read_u32(stream)? as usize;
    let name = String::from_utf8(read_exact_vec(stream, name_len)?).map_err(|e| {
        Error::MalformedFrame {
            codec: "binary",
            reason: e.to_string(),
        }
    })?;

    let value_len = read_u32(stream)? as usize;
    let wire_value = read_exact_vec(stream, value_len)?;
    let value = swap_endian(&wire_value, swap_element_size(rtti));

    let terminator = read_u8(stream)?;
    let is_damaged = terminator != FRAME_END;

    Ok(SerNodeInfo {
        rtti,
        level,
        name,
        value,
        is_damaged,
        is_last_child: false,
    })
}

fn read_u8(stream: &mut dyn Stream) -> Result<u8> {
    let mut buf = [0u8; 1];
    stream.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32(stream: &mut dyn Stream) -> Result<u32> {
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_exact_vec(stream: &mut dyn Stream, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    #[test]
    fn round_trips_a_scalar_node() {
        let mut mem = MemoryStream::new();
        let node = SerNodeInfo::new(Rtti::scalar(Kind::Int), 1, "count", 42i32.to_ne_bytes().to_vec());
        BinaryCodec.write(&node, &mut mem).unwrap();

        mem.set_position(0).unwrap();
        let read = BinaryCodec.read(&mut mem).unwrap().unwrap();
        assert_eq!(read.name, "count");
        assert_eq!(read.rtti, Rtti::scalar(Kind::Int));
        assert!(!read.is_damaged);
        assert_eq!(i32::from_ne_bytes(read.value.try_into().unwrap()), 42);
    }

    #[test]
    fn tolerates_noise_before_a_frame() {
        let mut mem = MemoryStream::new();
        mem.write_all(b"garbage-before").unwrap();
        let node = SerNodeInfo::new(Rtti::scalar(Kind::Bool), 0, "flag", vec![1]);
        BinaryCodec.write(&node, &mut mem).unwrap();

        mem.set_position(0).unwrap();
        let read = BinaryCodec.read(&mut mem).unwrap().unwrap();
        assert_eq!(read.name, "flag");
    }

    #[test]
    fn missing_terminator_marks_damage() {
        let mut mem = MemoryStream::new();
        mem.write_all(&[FRAME_START]).unwrap();
        mem.write_all(&0u32.to_le_bytes()).unwrap();
        mem.write_all(&[Kind::Bool as u8, 0]).unwrap();
        mem.write_all(&1u32.to_le_bytes()).unwrap();
        mem.write_all(b"x").unwrap();
        mem.write_all(&1u32.to_le_bytes()).unwrap();
        mem.write_all(&[1]).unwrap();
        mem.write_all(&[0x00]).unwrap(); // wrong terminator

        mem.set_position(0).unwrap();
        let read = BinaryCodec.read(&mut mem).unwrap().unwrap();
        assert!(read.is_damaged);
    }

    #[test]
    fn end_of_stream_returns_none() {
        let mut mem = MemoryStream::new();
        assert!(BinaryCodec.read(&mut mem).unwrap().is_none());
    }
}
