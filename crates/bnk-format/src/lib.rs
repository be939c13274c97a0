//! SoundBank (`.bnk`) container format.
//!
//! A bank is a flat sequence of chunks, each a 4-byte tag, a little-endian
//! u32 length, and that many payload bytes. Two chunks carry the embedded
//! `.wem` objects:
//!
//! - **`DIDX`**: fixed-width `(id, offset, size)` records
//! - **`DATA`**: the object bytes, each object starting on a 16-byte boundary
//!
//! # Architecture
//!
//! - [`ChunkReader`] / [`read_chunks`]: length-prefixed framing, no payload interpretation
//! - [`write_chunks`]: the inverse; untouched chunks come out byte-identical
//! - [`ObjectIndex`]: the decoded `DIDX` table
//! - [`PayloadStore`]: the `DATA` bytes plus the transactional layout rewrite
//! - [`Bank`]: all of the above assembled over one file's bytes
//!
//! This crate does no filesystem I/O.

pub mod bank;
pub mod chunk;
pub mod error;
pub mod index;
pub mod reader;
pub mod store;
pub mod writer;

pub use bank::Bank;
pub use chunk::{BankHeader, Chunk, ChunkTag, CHUNK_HEADER_SIZE};
pub use error::{FormatError, FormatResult};
pub use index::{ObjectIndex, ObjectRecord, WemId, RECORD_SIZE};
pub use reader::{read_chunks, ChunkReader};
pub use store::{align_up, ObjectEdit, PayloadStore, DEFAULT_ALIGNMENT};
pub use writer::{write_chunk, write_chunks};
