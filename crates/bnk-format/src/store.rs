use std::collections::HashMap;

use tracing::debug;

use crate::error::{FormatError, FormatResult};
use crate::index::{ObjectIndex, ObjectRecord, WemId};

/// Default start alignment of objects inside the `DATA` payload.
pub const DEFAULT_ALIGNMENT: u32 = 16;

/// A change to one embedded object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectEdit {
    /// New bytes for the object. Zero-length is valid and silences it.
    Replace(Vec<u8>),
    /// Drop the object's bytes and its index record.
    Delete,
}

/// The `DATA` payload: every object's bytes, addressed by the index.
///
/// Layout invariant after any rewrite: each object rewritten or moved starts
/// on a multiple of `alignment`, pad bytes are zero, and the payload ends at
/// the end of the last object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadStore {
    bytes: Vec<u8>,
    alignment: u32,
}

impl PayloadStore {
    pub fn new(bytes: Vec<u8>, alignment: u32) -> Self {
        Self {
            bytes,
            alignment: alignment.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The exact bytes `[offset, offset + size)` of one record.
    pub fn extract(&self, record: &ObjectRecord) -> FormatResult<&[u8]> {
        let start = record.offset as usize;
        let end = start + record.size as usize;
        self.bytes.get(start..end).ok_or_else(|| {
            FormatError::index(format!(
                "object {} spans {start}..{end} past payload end {}",
                record.id,
                self.bytes.len()
            ))
        })
    }

    /// Apply one edit. See [`PayloadStore::apply_edits`].
    pub fn apply_edit(
        &mut self,
        index: &mut ObjectIndex,
        id: WemId,
        edit: ObjectEdit,
    ) -> FormatResult<()> {
        self.apply_edits(index, &HashMap::from([(id, edit)]))
    }

    /// Apply a set of edits as one transaction.
    ///
    /// Records are walked in offset order. Everything before the first edited
    /// record keeps its offset and bytes. From there on every surviving
    /// object is re-placed at the next aligned position, so size changes
    /// shift later objects and padding is recomputed. The new buffer and
    /// records are built in full and swapped in only on success; on error
    /// neither `self` nor `index` changes.
    pub fn apply_edits(
        &mut self,
        index: &mut ObjectIndex,
        edits: &HashMap<WemId, ObjectEdit>,
    ) -> FormatResult<()> {
        if let Some(unknown) = edits.keys().find(|id| !index.contains(**id)) {
            return Err(FormatError::UnknownObjectId(*unknown));
        }

        let records = index.records();
        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by_key(|&i| records[i].offset);

        let Some(first_edit) = order
            .iter()
            .position(|&i| edits.contains_key(&records[i].id))
        else {
            return Ok(());
        };

        let prefix_end = order[..first_edit]
            .iter()
            .map(|&i| records[i].end() as usize)
            .max()
            .unwrap_or(0);

        let mut buf = Vec::with_capacity(self.bytes.len());
        buf.extend_from_slice(&self.bytes[..prefix_end]);

        let mut placed: Vec<Option<ObjectRecord>> = records.iter().copied().map(Some).collect();
        for &i in &order[first_edit..] {
            let record = records[i];
            let data = match edits.get(&record.id) {
                Some(ObjectEdit::Replace(data)) => data.as_slice(),
                Some(ObjectEdit::Delete) => {
                    placed[i] = None;
                    continue;
                }
                None => self.extract(&record)?,
            };

            let start = align_up(buf.len(), self.alignment as usize);
            buf.resize(start, 0);
            buf.extend_from_slice(data);
            if buf.len() > u32::MAX as usize {
                return Err(FormatError::index(format!(
                    "payload grows past 4 GiB while placing object {}",
                    record.id
                )));
            }
            placed[i] = Some(ObjectRecord {
                id: record.id,
                offset: start as u32,
                size: data.len() as u32,
            });
        }

        debug!(
            edits = edits.len(),
            old_len = self.bytes.len(),
            new_len = buf.len(),
            kept_prefix = prefix_end,
            "rewrote payload store"
        );

        index.set_records(placed.into_iter().flatten().collect());
        self.bytes = buf;
        Ok(())
    }
}

/// Round `pos` up to the next multiple of `alignment`.
pub fn align_up(pos: usize, alignment: usize) -> usize {
    match pos % alignment {
        0 => pos,
        rem => pos + (alignment - rem),
    }
}
