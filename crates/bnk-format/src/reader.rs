use tracing::debug;

use crate::chunk::{read_u32_le, Chunk, ChunkTag, CHUNK_HEADER_SIZE};
use crate::error::{FormatError, FormatResult};

/// Walks the flat sequence of top-level chunks in a bank file.
///
/// Each chunk starts immediately after the previous one's payload. The
/// reader never looks inside a payload.
#[derive(Debug)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            failed: false,
        }
    }

    /// Current read position (start of the next chunk header).
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_next(&mut self) -> FormatResult<Chunk> {
        let start = self.pos;
        let remaining = self.data.len() - start;
        if remaining < CHUNK_HEADER_SIZE {
            return Err(FormatError::container(
                start,
                format!("truncated chunk header: {remaining} bytes left"),
            ));
        }

        let mut code = [0u8; 4];
        code.copy_from_slice(&self.data[start..start + 4]);
        let tag = ChunkTag::from_bytes(code);
        let length = read_u32_le(self.data, start + 4) as usize;

        let body = start + CHUNK_HEADER_SIZE;
        let end = body
            .checked_add(length)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                FormatError::container(
                    start,
                    format!(
                        "chunk {tag} declares {length} bytes but only {} remain",
                        self.data.len() - body
                    ),
                )
            })?;

        self.pos = end;
        Ok(Chunk::new(tag, start as u64, self.data[body..end].to_vec()))
    }
}

impl Iterator for ChunkReader<'_> {
    type Item = FormatResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        let result = self.read_next();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Parse a complete bank file into its chunk sequence.
///
/// The first chunk must be `BKHD` in little-endian framing. A byte-swapped
/// tag means a big-endian bank, which is rejected rather than guessed at.
pub fn read_chunks(data: &[u8]) -> FormatResult<Vec<Chunk>> {
    if data.len() < 4 {
        return Err(FormatError::container(0, "file too short for a chunk tag"));
    }
    match &data[0..4] {
        b"BKHD" => {}
        b"DHKB" => {
            return Err(FormatError::container(0, "big-endian bank not supported"));
        }
        other => {
            let mut code = [0u8; 4];
            code.copy_from_slice(other);
            return Err(FormatError::container(
                0,
                format!("expected BKHD, found {}", ChunkTag::from_bytes(code)),
            ));
        }
    }

    let chunks = ChunkReader::new(data).collect::<FormatResult<Vec<_>>>()?;
    debug!(count = chunks.len(), bytes = data.len(), "parsed chunk sequence");
    Ok(chunks)
}
