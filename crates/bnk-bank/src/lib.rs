//! Editing SoundBank files on disk.
//!
//! Wraps the in-memory [`bnk_format::Bank`] with the edit lifecycle:
//!
//! 1. **Load**: read the whole file and decode it; malformed input fails here.
//! 2. **Stage**: validate and record requested edits (replace, empty, delete).
//! 3. **Commit**: apply every staged edit to the payload store in one pass.
//! 4. **Save**: back up the target to `<path>.NNN`, then atomically replace it.
//!
//! A run that stages nothing never writes anything.

pub mod backup;
pub mod config;
pub mod edit;
pub mod error;
pub mod mutator;

pub use backup::{write_atomic, BackupWriter};
pub use config::BankConfig;
pub use edit::{BatchReport, EditAction, SkippedEdit};
pub use error::{BankError, BankResult};
pub use mutator::{BankMutator, BankState, SaveOutcome};

// Re-export the format types callers need alongside the mutator.
pub use bnk_format::{BankHeader, Chunk, ChunkTag, ObjectRecord, WemId};
