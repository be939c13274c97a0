use crate::chunk::Chunk;

/// Serialize a chunk sequence back into a bank file.
///
/// Each chunk is emitted as tag + current payload length + payload, in the
/// given order. Chunks whose payload was never replaced come out exactly as
/// they were read.
pub fn write_chunks(chunks: &[Chunk]) -> Vec<u8> {
    let total = chunks.iter().map(Chunk::encoded_len).sum();
    let mut buf = Vec::with_capacity(total);
    for chunk in chunks {
        write_chunk(&mut buf, chunk);
    }
    buf
}

/// Append one chunk (header + payload) to `buf`.
pub fn write_chunk(buf: &mut Vec<u8>, chunk: &Chunk) {
    buf.extend_from_slice(&chunk.tag().to_bytes());
    buf.extend_from_slice(&chunk.len().to_le_bytes());
    buf.extend_from_slice(chunk.payload());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkTag;
    use crate::reader::read_chunks;

    #[test]
    fn read_write_identity() {
        let mut data = Vec::new();
        for (tag, payload) in [
            (b"BKHD", &b"\x8c\0\0\0\x01\0\0\0"[..]),
            (b"STID", &b"names"[..]),
            (b"QQQQ", &b"\x00\x01\x02"[..]),
        ] {
            data.extend_from_slice(tag);
            data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            data.extend_from_slice(payload);
        }
        let chunks = read_chunks(&data).unwrap();
        assert_eq!(write_chunks(&chunks), data);
    }

    #[test]
    fn rewritten_length_follows_payload() {
        let mut chunk = Chunk::new(ChunkTag::Data, 0, vec![0; 4]);
        chunk.replace_payload(vec![7; 20]);
        let out = write_chunks(&[chunk]);
        assert_eq!(&out[0..4], b"DATA");
        assert_eq!(u32::from_le_bytes(out[4..8].try_into().unwrap()), 20);
        assert_eq!(out.len(), 28);
    }
}
