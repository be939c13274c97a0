use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chunk::{read_u32_le, Chunk};
use crate::error::{FormatError, FormatResult};

/// Width of one `DIDX` record: id, offset, size.
pub const RECORD_SIZE: usize = 12;

/// Numeric identifier of an embedded object (a `.wem` stream).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WemId(pub u32);

impl fmt::Display for WemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for WemId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// One index record. `offset` is relative to the start of the `DATA` payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ObjectRecord {
    pub id: WemId,
    pub offset: u32,
    pub size: u32,
}

impl ObjectRecord {
    /// One past the last byte of this object.
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.size as u64
    }
}

/// The decoded `DIDX` chunk.
///
/// Records stay in index order, which is the order used for listing and for
/// re-serialization. Offsets are not assumed to be sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectIndex {
    records: Vec<ObjectRecord>,
}

impl ObjectIndex {
    /// Build an index from records, checking ids and overlap.
    ///
    /// `data_len` is the `DATA` payload length every record must fit in.
    pub fn new(records: Vec<ObjectRecord>, data_len: u64) -> FormatResult<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id) {
                return Err(FormatError::index(format!("duplicate object id {}", record.id)));
            }
            if record.end() > data_len {
                return Err(FormatError::index(format!(
                    "object {} spans {}..{} past payload end {data_len}",
                    record.id,
                    record.offset,
                    record.end()
                )));
            }
        }

        let mut by_offset: Vec<&ObjectRecord> = records.iter().filter(|r| r.size > 0).collect();
        by_offset.sort_by_key(|r| r.offset);
        for pair in by_offset.windows(2) {
            if pair[0].end() > pair[1].offset as u64 {
                return Err(FormatError::index(format!(
                    "objects {} and {} overlap at offset {}",
                    pair[0].id, pair[1].id, pair[1].offset
                )));
            }
        }

        Ok(Self { records })
    }

    /// Parse a `DIDX` chunk payload.
    pub fn parse(chunk: &Chunk, data_len: u64) -> FormatResult<Self> {
        let payload = chunk.payload();
        if payload.len() % RECORD_SIZE != 0 {
            return Err(FormatError::index(format!(
                "index length {} is not a multiple of {RECORD_SIZE}",
                payload.len()
            )));
        }
        let records = payload
            .chunks_exact(RECORD_SIZE)
            .map(|raw| ObjectRecord {
                id: WemId(read_u32_le(raw, 0)),
                offset: read_u32_le(raw, 4),
                size: read_u32_le(raw, 8),
            })
            .collect();
        Self::new(records, data_len)
    }

    /// Serialize back to a `DIDX` payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.records.len() * RECORD_SIZE);
        for record in &self.records {
            buf.extend_from_slice(&record.id.0.to_le_bytes());
            buf.extend_from_slice(&record.offset.to_le_bytes());
            buf.extend_from_slice(&record.size.to_le_bytes());
        }
        buf
    }

    pub fn find(&self, id: WemId) -> FormatResult<&ObjectRecord> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or(FormatError::UnknownObjectId(id))
    }

    pub fn contains(&self, id: WemId) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    /// `(id, size)` pairs in index order. Call again to restart.
    pub fn list(&self) -> impl Iterator<Item = (WemId, u32)> + Clone + '_ {
        self.records.iter().map(|r| (r.id, r.size))
    }

    pub fn records(&self) -> &[ObjectRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replace the record set after a payload rewrite. Callers produce the
    /// records from a fresh layout, so no validation is repeated here.
    pub(crate) fn set_records(&mut self, records: Vec<ObjectRecord>) {
        self.records = records;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkTag;

    fn rec(id: u32, offset: u32, size: u32) -> ObjectRecord {
        ObjectRecord {
            id: WemId(id),
            offset,
            size,
        }
    }

    fn didx(records: &[ObjectRecord]) -> Chunk {
        let index = ObjectIndex {
            records: records.to_vec(),
        };
        Chunk::new(ChunkTag::Didx, 0, index.to_bytes())
    }

    #[test]
    fn parse_and_find() {
        let chunk = didx(&[rec(7, 0, 10), rec(3, 16, 4)]);
        let index = ObjectIndex::parse(&chunk, 20).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.find(WemId(3)).unwrap().offset, 16);
        assert!(index.contains(WemId(7)));
        assert!(matches!(
            index.find(WemId(99)),
            Err(FormatError::UnknownObjectId(WemId(99)))
        ));
    }

    #[test]
    fn list_is_index_order_and_restartable() {
        let chunk = didx(&[rec(9, 32, 1), rec(1, 0, 5), rec(5, 16, 2)]);
        let index = ObjectIndex::parse(&chunk, 33).unwrap();
        let listing = index.list();
        let first: Vec<_> = listing.clone().collect();
        let second: Vec<_> = listing.collect();
        assert_eq!(first, vec![(WemId(9), 1), (WemId(1), 5), (WemId(5), 2)]);
        assert_eq!(first, second);
    }

    #[test]
    fn bad_record_width() {
        let chunk = Chunk::new(ChunkTag::Didx, 0, vec![0; 13]);
        assert!(matches!(
            ObjectIndex::parse(&chunk, 100),
            Err(FormatError::MalformedIndex { .. })
        ));
    }

    #[test]
    fn overlapping_records() {
        let chunk = didx(&[rec(1, 0, 20), rec(2, 16, 4)]);
        let err = ObjectIndex::parse(&chunk, 100).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn unsorted_but_disjoint_is_fine() {
        let chunk = didx(&[rec(1, 32, 8), rec(2, 0, 16), rec(3, 16, 16)]);
        assert!(ObjectIndex::parse(&chunk, 40).is_ok());
    }

    #[test]
    fn zero_size_never_overlaps() {
        let chunk = didx(&[rec(1, 0, 16), rec(2, 8, 0)]);
        assert!(ObjectIndex::parse(&chunk, 16).is_ok());
    }

    #[test]
    fn record_past_payload_end() {
        let chunk = didx(&[rec(1, 0, 17)]);
        assert!(matches!(
            ObjectIndex::parse(&chunk, 16),
            Err(FormatError::MalformedIndex { .. })
        ));
    }

    #[test]
    fn duplicate_ids() {
        let chunk = didx(&[rec(1, 0, 4), rec(1, 16, 4)]);
        let err = ObjectIndex::parse(&chunk, 20).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn empty_index() {
        let chunk = Chunk::new(ChunkTag::Didx, 0, vec![]);
        let index = ObjectIndex::parse(&chunk, 0).unwrap();
        assert!(index.is_empty());
        assert!(index.to_bytes().is_empty());
    }
}
