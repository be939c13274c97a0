use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use bnk_format::{Bank, BankHeader, ObjectRecord, WemId};
use tracing::{debug, info, warn};

use crate::backup::{write_atomic, BackupWriter};
use crate::config::BankConfig;
use crate::edit::{BatchReport, EditAction, SkippedEdit};
use crate::error::{BankError, BankResult};

/// Lifecycle of a [`BankMutator`].
///
/// A load failure never produces a mutator, so there is no failed state to
/// observe: the error is returned to the caller instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BankState {
    /// Parsed; no edits applied to the in-memory bank yet.
    Loaded,
    /// Edits applied to the in-memory bank, not yet written.
    Staged,
    /// Written to disk. Terminal.
    Saved,
}

/// What `save` did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No edits: nothing was backed up or written.
    Unchanged,
    Written {
        path: PathBuf,
        backup: Option<PathBuf>,
        bytes: usize,
    },
}

/// Orchestrates edits against one bank: stage, commit, save.
///
/// Staging only validates and records the request. `commit` applies every
/// pending edit to the payload store and index in one pass. `save` commits
/// anything still pending, snapshots the target, and atomically rewrites it.
#[derive(Debug)]
pub struct BankMutator {
    source: Option<PathBuf>,
    config: BankConfig,
    bank: Bank,
    pending: BTreeMap<WemId, EditAction>,
    applied: Vec<(WemId, &'static str)>,
    state: BankState,
}

impl BankMutator {
    /// Load a bank file with default settings.
    pub fn load(path: &Path) -> BankResult<Self> {
        Self::load_with_config(path, BankConfig::default())
    }

    pub fn load_with_config(path: &Path, config: BankConfig) -> BankResult<Self> {
        config.validate()?;
        let data = std::fs::read(path).map_err(|e| BankError::io(path, e))?;
        debug!(path = %path.display(), bytes = data.len(), "read bank");
        let mut mutator = Self::from_bytes(&data, config)?;
        mutator.source = Some(path.to_path_buf());
        Ok(mutator)
    }

    /// Decode a bank already in memory. `save_in_place` is unavailable.
    pub fn from_bytes(data: &[u8], config: BankConfig) -> BankResult<Self> {
        config.validate()?;
        let bank = Bank::parse(data, config.alignment)?;
        Ok(Self {
            source: None,
            config,
            bank,
            pending: BTreeMap::new(),
            applied: Vec::new(),
            state: BankState::Loaded,
        })
    }

    pub fn state(&self) -> BankState {
        self.state
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    pub fn header(&self) -> BankHeader {
        self.bank.header()
    }

    /// `(id, size)` in index order, reflecting committed edits.
    pub fn list(&self) -> impl Iterator<Item = (WemId, u32)> + Clone + '_ {
        self.bank.list()
    }

    pub fn find(&self, id: WemId) -> BankResult<ObjectRecord> {
        Ok(*self.bank.find(id)?)
    }

    pub fn extract(&self, id: WemId) -> BankResult<&[u8]> {
        Ok(self.bank.extract(id)?)
    }

    /// Write one object's bytes to `<dir>/<id>.wem`.
    pub fn extract_to_dir(&self, id: WemId, dir: &Path) -> BankResult<PathBuf> {
        let bytes = self.extract(id)?;
        let path = dir.join(format!("{id}.wem"));
        write_atomic(&path, bytes)?;
        debug!(id = %id, path = %path.display(), bytes = bytes.len(), "extracted object");
        Ok(path)
    }

    /// Number of staged edits not yet committed.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Edits applied so far, in commit order.
    pub fn applied(&self) -> &[(WemId, &'static str)] {
        &self.applied
    }

    /// Record an edit for the next commit. A later edit to the same id
    /// replaces an earlier one.
    pub fn stage(&mut self, id: WemId, action: EditAction) -> BankResult<()> {
        self.ensure_open()?;
        if !self.bank.index().contains(id) {
            return Err(BankError::UnknownObjectId(id));
        }
        debug!(id = %id, action = action.verb(), "staged edit");
        self.pending.insert(id, action);
        Ok(())
    }

    pub fn stage_replace(&mut self, id: WemId, bytes: Vec<u8>) -> BankResult<()> {
        self.stage(id, EditAction::Replace(bytes))
    }

    /// Silence an object. Its record stays resolvable with size zero.
    pub fn stage_empty(&mut self, id: WemId) -> BankResult<()> {
        self.stage(id, EditAction::Empty)
    }

    /// Remove an object's record entirely.
    pub fn stage_delete(&mut self, id: WemId) -> BankResult<()> {
        self.stage(id, EditAction::Delete)
    }

    /// Stage a list of edits, skipping unknown ids with a warning.
    ///
    /// Only state errors abort the batch; every unknown id is collected in
    /// the returned report.
    pub fn stage_batch<I>(&mut self, edits: I) -> BankResult<BatchReport>
    where
        I: IntoIterator<Item = (WemId, EditAction)>,
    {
        let mut report = BatchReport::default();
        for (id, action) in edits {
            match self.stage(id, action) {
                Ok(()) => report.staged.push(id),
                Err(BankError::UnknownObjectId(id)) => {
                    warn!(id = %id, "object not in bank, skipping");
                    report
                        .skipped
                        .push(SkippedEdit::for_id(id, "unknown object id"));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Apply all pending edits as one transaction.
    pub fn commit(&mut self) -> BankResult<BankState> {
        self.ensure_open()?;
        if self.pending.is_empty() {
            return Ok(self.state);
        }

        // Pending edits stay queued until the bank accepts them.
        let edits: HashMap<_, _> = self
            .pending
            .iter()
            .map(|(id, action)| (*id, action.clone().into_object_edit()))
            .collect();
        self.bank.apply_edits(&edits)?;

        let pending = std::mem::take(&mut self.pending);
        debug!(edits = pending.len(), "committed edits");
        self.applied
            .extend(pending.iter().map(|(id, action)| (*id, action.verb())));
        self.state = BankState::Staged;
        Ok(self.state)
    }

    /// Commit, back up the current file at `path`, and write the bank there.
    ///
    /// With no edits this is a no-op and the file system is not touched.
    pub fn save(&mut self, path: &Path) -> BankResult<SaveOutcome> {
        self.commit()?;
        if !self.bank.is_dirty() {
            debug!(path = %path.display(), "no edits, leaving file untouched");
            return Ok(SaveOutcome::Unchanged);
        }

        let backup = if self.config.create_backups {
            BackupWriter::new().snapshot(path)?
        } else {
            None
        };
        let bytes = self.bank.to_bytes();
        write_atomic(path, &bytes)?;
        self.state = BankState::Saved;

        info!(
            path = %path.display(),
            bytes = bytes.len(),
            edits = self.applied.len(),
            "saved bank"
        );
        Ok(SaveOutcome::Written {
            path: path.to_path_buf(),
            backup,
            bytes: bytes.len(),
        })
    }

    /// Save back to the file this bank was loaded from.
    pub fn save_in_place(&mut self) -> BankResult<SaveOutcome> {
        let path = self
            .source
            .clone()
            .ok_or_else(|| BankError::InvalidState("bank was not loaded from a file".into()))?;
        self.save(&path)
    }

    /// The bank serialized with committed edits.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bank.to_bytes()
    }

    fn ensure_open(&self) -> BankResult<()> {
        if self.state == BankState::Saved {
            return Err(BankError::InvalidState("bank already saved".into()));
        }
        Ok(())
    }
}
