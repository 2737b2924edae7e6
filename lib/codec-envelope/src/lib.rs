//! Frames `(rgb, depth_or_null, meta_string)` into a single binary message
//! and back. Codec internals (how JPEG/PNG bytes are produced) are out of
//! scope, callers supply/consume pre-encoded `Vec<u8>` image bytes.
//!
//! Envelope layout, little-endian:
//! ```text
//! byte 0     : pack_type (Jpg | JpgPng)
//! bytes 1..5 : u32 length of payload-A (rgb, JPEG)
//! bytes 5..9 : u32 length of payload-B (Jpg: meta utf-8; JpgPng: depth PNG)
//! bytes 9..13: u32 length of payload-C (JpgPng only: meta utf-8)
//! then       : payload-A || payload-B [|| payload-C]
//! ```

use core::fmt;

/// The closed set of envelope layouts. Concrete discriminant values are not
/// specified upstream; `Jpg = 1`/`JpgPng = 2` are chosen here so that byte 0
/// is never `0`, distinguishing a real envelope from an all-zero buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PackType {
    Jpg = 1,
    JpgPng = 2,
}

impl PackType {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Jpg),
            2 => Some(Self::JpgPng),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The leading byte did not name a known `PackType`.
    UnknownPackType,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPackType => fmt.write_str("unknown envelope pack type"),
        }
    }
}

impl error_stack::Context for ErrorKind {}

pub type Result<T, C = ErrorKind> = error_stack::Result<T, C>;

/// A decoded envelope: `rgb` is always present, `depth` only for `JpgPng`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub rgb: Vec<u8>,
    pub depth: Option<Vec<u8>>,
    pub meta: String,
}

/// Packs a JPEG-encoded `rgb` buffer with a UTF-8 `meta` string.
pub fn pack_jpg(rgb: &[u8], meta: &str) -> Vec<u8> {
    let meta_bytes = meta.as_bytes();
    let mut out = Vec::with_capacity(1 + 8 + rgb.len() + meta_bytes.len());
    out.push(PackType::Jpg as u8);
    out.extend_from_slice(&(rgb.len() as u32).to_le_bytes());
    out.extend_from_slice(&(meta_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(rgb);
    out.extend_from_slice(meta_bytes);
    out
}

/// Packs a JPEG-encoded `rgb` buffer, a PNG-encoded `depth` buffer, and a
/// UTF-8 `meta` string.
pub fn pack_jpg_png(rgb: &[u8], depth: &[u8], meta: &str) -> Vec<u8> {
    let meta_bytes = meta.as_bytes();
    let mut out = Vec::with_capacity(1 + 12 + rgb.len() + depth.len() + meta_bytes.len());
    out.push(PackType::JpgPng as u8);
    out.extend_from_slice(&(rgb.len() as u32).to_le_bytes());
    out.extend_from_slice(&(depth.len() as u32).to_le_bytes());
    out.extend_from_slice(&(meta_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(rgb);
    out.extend_from_slice(depth);
    out.extend_from_slice(meta_bytes);
    out
}

/// Length-checked unpack. Any size mismatch (truncated buffer, corrupted
/// length field) returns `Ok(None)` rather than an error: a malformed frame
/// is an expected, recoverable condition on this path, not a protocol
/// violation.
pub fn unpack(buffer: &[u8]) -> Result<Option<Frame>> {
    let Some(&pack_byte) = buffer.first() else {
        return Ok(None);
    };
    let pack_type = PackType::from_byte(pack_byte)
        .ok_or(ErrorKind::UnknownPackType)
        .map_err(error_stack::Report::new)?;

    match pack_type {
        PackType::Jpg => Ok(unpack_jpg(buffer)),
        PackType::JpgPng => Ok(unpack_jpg_png(buffer)),
    }
}

fn read_u32(buffer: &[u8], offset: usize) -> Option<u32> {
    buffer
        .get(offset..offset + 4)
        .map(|bytes| u32::from_le_bytes(bytes.try_into().expect("slice is 4 bytes")))
}

fn unpack_jpg(buffer: &[u8]) -> Option<Frame> {
    let l1 = read_u32(buffer, 1)? as usize;
    let l2 = read_u32(buffer, 5)? as usize;
    if buffer.len() != l1 + l2 + 9 {
        return None;
    }

    let rgb = buffer[9..9 + l1].to_vec();
    let meta = String::from_utf8(buffer[9 + l1..9 + l1 + l2].to_vec()).ok()?;
    Some(Frame {
        rgb,
        depth: None,
        meta,
    })
}

fn unpack_jpg_png(buffer: &[u8]) -> Option<Frame> {
    let l1 = read_u32(buffer, 1)? as usize;
    let l2 = read_u32(buffer, 5)? as usize;
    let l3 = read_u32(buffer, 9)? as usize;
    if buffer.len() != l1 + l2 + l3 + 13 {
        return None;
    }

    let rgb = buffer[13..13 + l1].to_vec();
    let depth = buffer[13 + l1..13 + l1 + l2].to_vec();
    let meta = String::from_utf8(buffer[13 + l1 + l2..13 + l1 + l2 + l3].to_vec()).ok()?;
    Some(Frame {
        rgb,
        depth: Some(depth),
        meta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpg_round_trips() {
        let packed = pack_jpg(b"jpeg-bytes", r#"{"frameindex":0}"#);
        let frame = unpack(&packed).unwrap().unwrap();
        assert_eq!(frame.rgb, b"jpeg-bytes");
        assert_eq!(frame.depth, None);
        assert_eq!(frame.meta, r#"{"frameindex":0}"#);
    }

    #[test]
    fn jpg_png_round_trips() {
        let packed = pack_jpg_png(b"jpeg-bytes", b"png-bytes", "{}");
        let frame = unpack(&packed).unwrap().unwrap();
        assert_eq!(frame.rgb, b"jpeg-bytes");
        assert_eq!(frame.depth.as_deref(), Some(b"png-bytes".as_slice()));
        assert_eq!(frame.meta, "{}");
    }

    #[test]
    fn truncated_buffer_unpacks_to_none() {
        let mut packed = pack_jpg(b"jpeg-bytes", "{}");
        packed.truncate(packed.len() - 1);
        assert_eq!(unpack(&packed).unwrap(), None);
    }

    #[test]
    fn empty_buffer_unpacks_to_none() {
        assert_eq!(unpack(&[]).unwrap(), None);
    }

    #[test]
    fn unknown_pack_type_is_an_error() {
        let result = unpack(&[99, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(result.is_err());
    }
}
