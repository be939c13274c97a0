use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, FormatResult};

/// Size of a chunk header: 4-byte tag + little-endian u32 length.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Four-character chunk codes known to the bank format.
///
/// Only `Didx` and `Data` are ever interpreted for mutation. Every other
/// chunk, known or not, is carried through serialization untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkTag {
    /// Bank header: version and bank id.
    Bkhd,
    /// Object index: fixed-width (id, offset, size) records.
    Didx,
    /// Payload store: concatenated object bytes.
    Data,
    /// Object hierarchy.
    Hirc,
    /// String id table.
    Stid,
    /// Global settings.
    Stmg,
    /// Environment settings.
    Envs,
    /// Init bank marker.
    Init,
    /// Platform descriptor.
    Plat,
    /// Any tag this crate does not model.
    Unknown([u8; 4]),
}

impl ChunkTag {
    const KNOWN: [(ChunkTag, &'static [u8; 4]); 9] = [
        (ChunkTag::Bkhd, b"BKHD"),
        (ChunkTag::Didx, b"DIDX"),
        (ChunkTag::Data, b"DATA"),
        (ChunkTag::Hirc, b"HIRC"),
        (ChunkTag::Stid, b"STID"),
        (ChunkTag::Stmg, b"STMG"),
        (ChunkTag::Envs, b"ENVS"),
        (ChunkTag::Init, b"INIT"),
        (ChunkTag::Plat, b"PLAT"),
    ];

    /// Resolve a tag from its on-disk bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self::KNOWN
            .iter()
            .find(|(_, code)| **code == bytes)
            .map(|(tag, _)| *tag)
            .unwrap_or(Self::Unknown(bytes))
    }

    /// The on-disk bytes of this tag.
    pub fn to_bytes(self) -> [u8; 4] {
        if let Self::Unknown(bytes) = self {
            return bytes;
        }
        Self::KNOWN
            .iter()
            .find(|(tag, _)| *tag == self)
            .map(|(_, code)| **code)
            .unwrap_or([0; 4])
    }

    /// Whether this tag is modeled by the crate.
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic()) {
            // All graphic ASCII, so the conversion cannot fail.
            f.write_str(std::str::from_utf8(&bytes).unwrap_or("????"))
        } else {
            write!(f, "0x{}", hex::encode(bytes))
        }
    }
}

/// A single top-level chunk: tag plus raw payload.
///
/// The serialized length is always `payload.len()`, so the header can never
/// disagree with the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    tag: ChunkTag,
    /// Byte offset of the chunk header in the file it was read from.
    offset: u64,
    payload: Vec<u8>,
}

impl Chunk {
    pub fn new(tag: ChunkTag, offset: u64, payload: Vec<u8>) -> Self {
        Self {
            tag,
            offset,
            payload,
        }
    }

    pub fn tag(&self) -> ChunkTag {
        self.tag
    }

    /// Header offset in the source file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Payload length as written in the header.
    pub fn len(&self) -> u32 {
        self.payload.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Swap in a rewritten payload, returning the old one.
    pub fn replace_payload(&mut self, payload: Vec<u8>) -> Vec<u8> {
        std::mem::replace(&mut self.payload, payload)
    }

    /// Total serialized size (header + payload).
    pub fn encoded_len(&self) -> usize {
        CHUNK_HEADER_SIZE + self.payload.len()
    }
}

/// Read-only view of the `BKHD` payload prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BankHeader {
    pub version: u32,
    pub bank_id: u32,
}

impl BankHeader {
    pub fn parse(chunk: &Chunk) -> FormatResult<Self> {
        let payload = chunk.payload();
        if payload.len() < 8 {
            return Err(FormatError::container(
                chunk.offset() as usize,
                format!("BKHD payload too short: {} bytes", payload.len()),
            ));
        }
        Ok(Self {
            version: read_u32_le(payload, 0),
            bank_id: read_u32_le(payload, 4),
        })
    }
}

/// Read a little-endian u32 at `pos`. The caller guarantees bounds.
pub(crate) fn read_u32_le(data: &[u8], pos: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&data[pos..pos + 4]);
    u32::from_le_bytes(word)
}
