use std::collections::HashMap;

use tracing::debug;

use crate::chunk::{BankHeader, Chunk, ChunkTag};
use crate::error::{FormatError, FormatResult};
use crate::index::{ObjectIndex, ObjectRecord, WemId};
use crate::reader::read_chunks;
use crate::store::{ObjectEdit, PayloadStore};
use crate::writer::write_chunks;

/// A fully decoded bank held in memory.
///
/// Holds the chunk sequence in file order plus decoded views over the
/// `DIDX` and `DATA` chunks. Those two chunks' payloads are regenerated from
/// the views on serialization; every other chunk is emitted as read.
#[derive(Clone, Debug)]
pub struct Bank {
    chunks: Vec<Chunk>,
    header: BankHeader,
    index_pos: Option<usize>,
    data_pos: Option<usize>,
    index: ObjectIndex,
    store: PayloadStore,
    dirty: bool,
}

impl Bank {
    /// Decode a bank from its complete file bytes.
    pub fn parse(data: &[u8], alignment: u32) -> FormatResult<Self> {
        let chunks = read_chunks(data)?;
        let header = BankHeader::parse(&chunks[0])?;

        let index_pos = unique_position(&chunks, ChunkTag::Didx)?;
        let data_pos = unique_position(&chunks, ChunkTag::Data)?;

        let data_len = data_pos.map(|pos| chunks[pos].len() as u64).unwrap_or(0);
        let index = match index_pos {
            Some(pos) => ObjectIndex::parse(&chunks[pos], data_len)?,
            None => ObjectIndex::default(),
        };
        if data_pos.is_none() && index.records().iter().any(|r| r.size > 0) {
            return Err(FormatError::index("index references objects but bank has no DATA chunk"));
        }

        let store = PayloadStore::new(
            data_pos
                .map(|pos| chunks[pos].payload().to_vec())
                .unwrap_or_default(),
            alignment,
        );

        debug!(
            version = header.version,
            bank_id = header.bank_id,
            chunks = chunks.len(),
            objects = index.len(),
            "decoded bank"
        );

        Ok(Self {
            chunks,
            header,
            index_pos,
            data_pos,
            index,
            store,
            dirty: false,
        })
    }

    pub fn header(&self) -> BankHeader {
        self.header
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn index(&self) -> &ObjectIndex {
        &self.index
    }

    pub fn store(&self) -> &PayloadStore {
        &self.store
    }

    pub fn find(&self, id: WemId) -> FormatResult<&ObjectRecord> {
        self.index.find(id)
    }

    /// `(id, size)` for every object in index order.
    pub fn list(&self) -> impl Iterator<Item = (WemId, u32)> + Clone + '_ {
        self.index.list()
    }

    /// The bytes of one embedded object.
    pub fn extract(&self, id: WemId) -> FormatResult<&[u8]> {
        self.store.extract(self.index.find(id)?)
    }

    /// Whether any edit has been applied since parsing.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Apply edits as one transaction and refresh the `DIDX`/`DATA` chunks.
    pub fn apply_edits(&mut self, edits: &HashMap<WemId, ObjectEdit>) -> FormatResult<()> {
        if edits.is_empty() {
            return Ok(());
        }
        self.store.apply_edits(&mut self.index, edits)?;

        if let Some(pos) = self.index_pos {
            self.chunks[pos].replace_payload(self.index.to_bytes());
        }
        let payload = self.store.as_bytes().to_vec();
        match self.data_pos {
            Some(pos) => {
                self.chunks[pos].replace_payload(payload);
            }
            None if !payload.is_empty() => {
                // Index held only empty objects; DATA goes right after DIDX.
                let pos = self.index_pos.map_or(self.chunks.len(), |p| p + 1);
                self.chunks.insert(pos, Chunk::new(ChunkTag::Data, 0, payload));
                self.data_pos = Some(pos);
            }
            None => {}
        }
        self.dirty = true;
        Ok(())
    }

    /// Serialize the full chunk sequence.
    pub fn to_bytes(&self) -> Vec<u8> {
        write_chunks(&self.chunks)
    }
}

fn unique_position(chunks: &[Chunk], tag: ChunkTag) -> FormatResult<Option<usize>> {
    let mut found = chunks.iter().enumerate().filter(|(_, c)| c.tag() == tag);
    let first = found.next().map(|(pos, _)| pos);
    if let Some((_, dup)) = found.next() {
        return Err(FormatError::MalformedContainer {
            offset: dup.offset(),
            reason: format!("second {tag} chunk"),
        });
    }
    Ok(first)
}


#[cfg(test)]
mod tests {
    use super::fixtures::{bank, chunk};
    use super::*;

    fn sample() -> Vec<u8> {
        bank(&[(10, vec![1; 20]), (20, vec![2; 7]), (30, vec![3; 33])])
    }

    #[test]
    fn parse_lists_objects() {
        let bank = Bank::parse(&sample(), 16).unwrap();
        assert_eq!(bank.header().version, 134);
        assert_eq!(bank.header().bank_id, 0x1234_5678);
        let listing: Vec<_> = bank.list().map(|(id, size)| (id.0, size)).collect();
        assert_eq!(listing, vec![(10, 20), (20, 7), (30, 33)]);
        assert_eq!(bank.extract(WemId(20)).unwrap(), &[2; 7]);
    }

    #[test]
    fn unedited_roundtrip_is_identical() {
        let data = sample();
        let bank = Bank::parse(&data, 16).unwrap();
        assert!(!bank.is_dirty());
        assert_eq!(bank.to_bytes(), data);
    }

    #[test]
    fn edit_preserves_unmodeled_chunks() {
        let data = sample();
        let original = Bank::parse(&data, 16).unwrap();
        let mut bank = original.clone();
        bank.apply_edits(&HashMap::from([
            (WemId(10), ObjectEdit::Replace(vec![9; 100])),
            (WemId(30), ObjectEdit::Replace(Vec::new())),
        ]))
        .unwrap();
        assert!(bank.is_dirty());

        let reparsed = Bank::parse(&bank.to_bytes(), 16).unwrap();
        for (before, after) in original.chunks().iter().zip(reparsed.chunks()) {
            assert_eq!(before.tag(), after.tag());
            if !matches!(before.tag(), ChunkTag::Didx | ChunkTag::Data) {
                assert_eq!(before.payload(), after.payload());
            }
        }
        assert_eq!(reparsed.extract(WemId(10)).unwrap(), &[9; 100]);
        assert_eq!(reparsed.extract(WemId(20)).unwrap(), &[2; 7]);
        assert_eq!(reparsed.find(WemId(30)).unwrap().size, 0);
    }

    #[test]
    fn bank_without_objects() {
        let mut data = chunk(b"BKHD", &[0; 8]);
        data.extend(chunk(b"HIRC", b"x"));
        let bank = Bank::parse(&data, 16).unwrap();
        assert!(bank.index().is_empty());
        assert_eq!(bank.to_bytes(), data);
    }

    #[test]
    fn duplicate_data_chunk_rejected() {
        let mut data = sample();
        data.extend(chunk(b"DATA", b"again"));
        assert!(matches!(
            Bank::parse(&data, 16),
            Err(FormatError::MalformedContainer { .. })
        ));
    }

    #[test]
    fn index_without_data_rejected() {
        let mut didx = Vec::new();
        for word in [1u32, 0, 4] {
            didx.extend_from_slice(&word.to_le_bytes());
        }
        let mut data = chunk(b"BKHD", &[0; 8]);
        data.extend(chunk(b"DIDX", &didx));
        assert!(matches!(
            Bank::parse(&data, 16),
            Err(FormatError::MalformedIndex { .. })
        ));
    }

    #[test]
    fn extract_unknown_id() {
        let bank = Bank::parse(&sample(), 16).unwrap();
        assert!(matches!(
            bank.extract(WemId(999)),
            Err(FormatError::UnknownObjectId(WemId(999)))
        ));
    }
}
