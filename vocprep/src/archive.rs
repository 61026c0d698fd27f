//! Feature archive: the combined-mode record for one utterance
//!
//! Serialized with protobuf (proto3) wire encoding so the files can be read
//! by any protobuf runtime with this schema:
//!
//! ```text
//! message Matrix   { uint32 rows = 1; uint32 cols = 2; repeated float data = 3 [packed = true]; }
//! message Features { Matrix lab = 1; uint64 duration = 2; Matrix f0 = 3; Matrix mgc = 4; Matrix bap = 5; }
//! ```
//!
//! Integers use LEB128 varints. Floats are little-endian IEEE 754.

use thiserror::Error;

use crate::types::{FeatureMatrix, VocoderFeatures};

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

/// Maximum number of bytes needed to encode a u64 as LEB128 varint.
const MAX_VARINT_BYTES: usize = 10;

/// Archive encoding/decoding errors
#[derive(Debug, Error, PartialEq)]
pub enum ArchiveError {
    /// Buffer ended inside a field
    #[error("Truncated archive at byte {offset}")]
    Truncated { offset: usize },

    /// Varint longer than 10 bytes
    #[error("Malformed varint at byte {offset}")]
    MalformedVarint { offset: usize },

    /// Group or reserved wire type
    #[error("Unsupported wire type {wire_type} at byte {offset}")]
    UnsupportedWireType { wire_type: u8, offset: usize },

    /// Field has the wrong wire type for its number
    #[error("Field {field} has unexpected wire type {wire_type}")]
    UnexpectedWireType { field: u32, wire_type: u8 },

    /// Matrix data does not match its declared shape
    #[error("Matrix '{name}' declares {rows}x{cols} but holds {len} values")]
    ShapeMismatch {
        name: &'static str,
        rows: usize,
        cols: usize,
        len: usize,
    },

    /// Value does not fit the target integer type
    #[error("Field {field} value {value} out of range")]
    OutOfRange { field: u32, value: u64 },
}

/// Combined-mode record for one utterance
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureArchive {
    /// Binarized label, one row per frame
    pub lab: FeatureMatrix,
    /// Label frame count
    pub duration: u64,
    pub f0: FeatureMatrix,
    pub mgc: FeatureMatrix,
    pub bap: FeatureMatrix,
}

impl FeatureArchive {
    pub fn new(lab: FeatureMatrix, duration: usize, features: VocoderFeatures) -> Self {
        Self {
            lab,
            duration: duration as u64,
            f0: features.f0,
            mgc: features.mgc,
            bap: features.bap,
        }
    }

    /// Serialize to protobuf wire format
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_message(&mut buf, 1, &encode_matrix(&self.lab));
        if self.duration != 0 {
            write_tag(&mut buf, 2, WIRE_VARINT);
            write_varint(&mut buf, self.duration);
        }
        write_message(&mut buf, 3, &encode_matrix(&self.f0));
        write_message(&mut buf, 4, &encode_matrix(&self.mgc));
        write_message(&mut buf, 5, &encode_matrix(&self.bap));
        buf
    }

    /// Parse from protobuf wire format
    ///
    /// Unknown fields are skipped. Absent matrices decode as empty.
    pub fn decode(buf: &[u8]) -> Result<Self, ArchiveError> {
        let mut archive = FeatureArchive::default();
        let mut reader = Reader::new(buf);

        while !reader.is_empty() {
            let (field, wire_type) = reader.read_tag()?;
            match (field, wire_type) {
                (1, WIRE_LEN) => archive.lab = decode_matrix("lab", reader.read_len_delimited()?)?,
                (2, WIRE_VARINT) => archive.duration = reader.read_varint()?,
                (3, WIRE_LEN) => archive.f0 = decode_matrix("f0", reader.read_len_delimited()?)?,
                (4, WIRE_LEN) => archive.mgc = decode_matrix("mgc", reader.read_len_delimited()?)?,
                (5, WIRE_LEN) => archive.bap = decode_matrix("bap", reader.read_len_delimited()?)?,
                (1..=5, _) => return Err(ArchiveError::UnexpectedWireType { field, wire_type }),
                _ => reader.skip(wire_type)?,
            }
        }

        Ok(archive)
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn encode_matrix(matrix: &FeatureMatrix) -> Vec<u8> {
    let mut buf = Vec::with_capacity(matrix.as_slice().len() * 4 + 16);
    if matrix.rows() != 0 {
        write_tag(&mut buf, 1, WIRE_VARINT);
        write_varint(&mut buf, matrix.rows() as u64);
    }
    if matrix.cols() != 0 {
        write_tag(&mut buf, 2, WIRE_VARINT);
        write_varint(&mut buf, matrix.cols() as u64);
    }
    let data = matrix.as_slice();
    if !data.is_empty() {
        write_tag(&mut buf, 3, WIRE_LEN);
        write_varint(&mut buf, (data.len() * 4) as u64);
        for value in data {
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
    buf
}

fn write_message(buf: &mut Vec<u8>, field: u32, payload: &[u8]) {
    write_tag(buf, field, WIRE_LEN);
    write_varint(buf, payload.len() as u64);
    buf.extend_from_slice(payload);
}

fn write_tag(buf: &mut Vec<u8>, field: u32, wire_type: u8) {
    write_varint(buf, ((field as u64) << 3) | wire_type as u64);
}

/// Append `value` as a LEB128 varint
fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

// ============================================================================
// Decoding
// ============================================================================

fn decode_matrix(name: &'static str, buf: &[u8]) -> Result<FeatureMatrix, ArchiveError> {
    let mut rows = 0usize;
    let mut cols = 0usize;
    let mut data: Vec<f32> = Vec::new();
    let mut reader = Reader::new(buf);

    while !reader.is_empty() {
        let (field, wire_type) = reader.read_tag()?;
        match (field, wire_type) {
            (1, WIRE_VARINT) => rows = to_usize(field, reader.read_varint()?)?,
            (2, WIRE_VARINT) => cols = to_usize(field, reader.read_varint()?)?,
            (3, WIRE_LEN) => {
                let bytes = reader.read_len_delimited()?;
                if bytes.len() % 4 != 0 {
                    return Err(ArchiveError::Truncated {
                        offset: reader.pos,
                    });
                }
                data.extend(
                    bytes
                        .chunks_exact(4)
                        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])),
                );
            }
            // Unpacked repeated float
            (3, WIRE_FIXED32) => data.push(f32::from_le_bytes(reader.read_fixed::<4>()?)),
            (1..=3, _) => return Err(ArchiveError::UnexpectedWireType { field, wire_type }),
            _ => reader.skip(wire_type)?,
        }
    }

    let len = data.len();
    FeatureMatrix::from_vec(rows, cols, data).ok_or(ArchiveError::ShapeMismatch {
        name,
        rows,
        cols,
        len,
    })
}

fn to_usize(field: u32, value: u64) -> Result<usize, ArchiveError> {
    u32::try_from(value)
        .map(|v| v as usize)
        .map_err(|_| ArchiveError::OutOfRange { field, value })
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn read_varint(&mut self) -> Result<u64, ArchiveError> {
        let start = self.pos;
        let mut value = 0u64;
        for i in 0..MAX_VARINT_BYTES {
            let Some(&byte) = self.buf.get(self.pos) else {
                return Err(ArchiveError::Truncated { offset: self.pos });
            };
            self.pos += 1;
            value |= ((byte & 0x7F) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ArchiveError::MalformedVarint { offset: start })
    }

    fn read_tag(&mut self) -> Result<(u32, u8), ArchiveError> {
        let offset = self.pos;
        let key = self.read_varint()?;
        let wire_type = (key & 0x7) as u8;
        let field = u32::try_from(key >> 3).map_err(|_| ArchiveError::MalformedVarint { offset })?;
        Ok((field, wire_type))
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ArchiveError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(ArchiveError::Truncated { offset: self.pos })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_len_delimited(&mut self) -> Result<&'a [u8], ArchiveError> {
        let offset = self.pos;
        let len = usize::try_from(self.read_varint()?)
            .map_err(|_| ArchiveError::Truncated { offset })?;
        self.read_bytes(len)
    }

    fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], ArchiveError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    fn skip(&mut self, wire_type: u8) -> Result<(), ArchiveError> {
        match wire_type {
            WIRE_VARINT => self.read_varint().map(|_| ()),
            WIRE_FIXED64 => self.read_bytes(8).map(|_| ()),
            WIRE_LEN => self.read_len_delimited().map(|_| ()),
            WIRE_FIXED32 => self.read_bytes(4).map(|_| ()),
            _ => Err(ArchiveError::UnsupportedWireType {
                wire_type,
                offset: self.pos,
            }),
        }
    }
}
