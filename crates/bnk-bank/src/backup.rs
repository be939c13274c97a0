use std::ffi::OsString;
use std::fs::Permissions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{BankError, BankResult};

/// Highest backup suffix tried: `.000` through `.999`.
const MAX_BACKUPS: u32 = 1000;

/// Snapshots a file to the first unused `<path>.NNN` before it is rewritten.
///
/// Existing backups are never overwritten: each candidate is claimed with a
/// no-clobber link, so a concurrent writer that takes the same suffix first
/// just pushes this snapshot to the next one.
#[derive(Clone, Copy, Debug, Default)]
pub struct BackupWriter;

impl BackupWriter {
    pub fn new() -> Self {
        Self
    }

    /// `<path>.NNN` for a given index.
    pub fn backup_path(path: &Path, index: u32) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(format!(".{index:03}"));
        PathBuf::from(name)
    }

    /// The first backup path that does not exist yet.
    pub fn next_backup_path(path: &Path) -> BankResult<PathBuf> {
        (0..MAX_BACKUPS)
            .map(|i| Self::backup_path(path, i))
            .find(|candidate| !candidate.exists())
            .ok_or_else(|| {
                BankError::io(
                    path,
                    std::io::Error::other(format!("all {MAX_BACKUPS} backup slots are taken")),
                )
            })
    }

    /// Copy the current contents of `path` to a fresh backup.
    ///
    /// Returns `None` when `path` does not exist (nothing to preserve).
    pub fn snapshot(&self, path: &Path) -> BankResult<Option<PathBuf>> {
        let contents = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BankError::io(path, e)),
        };
        let permissions = permissions_for(path)?;

        let mut start = 0;
        loop {
            let candidate = (start..MAX_BACKUPS)
                .map(|i| (i, Self::backup_path(path, i)))
                .find(|(_, p)| !p.exists());
            let Some((index, target)) = candidate else {
                return Err(BankError::io(
                    path,
                    std::io::Error::other(format!("all {MAX_BACKUPS} backup slots are taken")),
                ));
            };

            let tmp = write_temp_beside(&target, &contents, permissions.clone())?;
            match tmp.persist_noclobber(&target) {
                Ok(_) => {
                    info!(backup = %target.display(), bytes = contents.len(), "wrote backup");
                    return Ok(Some(target));
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    debug!(taken = %target.display(), "backup slot claimed concurrently");
                    start = index + 1;
                }
                Err(e) => return Err(BankError::io(&target, e.error)),
            }
        }
    }
}

/// Replace `path` with `contents` atomically.
///
/// Data goes to a temp file in the same directory, is synced, and is then
/// renamed over `path`. A crash leaves either the old file or the new one.
/// The replacement keeps the permissions of the file it replaces.
pub fn write_atomic(path: &Path, contents: &[u8]) -> BankResult<()> {
    let tmp = write_temp_beside(path, contents, permissions_for(path)?)?;
    tmp.persist(path).map_err(|e| BankError::io(path, e.error))?;
    debug!(path = %path.display(), bytes = contents.len(), "replaced file");
    Ok(())
}

/// Permissions a file written at `path` should carry: those of the existing
/// file, or the usual default for a new one.
fn permissions_for(path: &Path) -> BankResult<Option<Permissions>> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.permissions())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(default_permissions()),
        Err(e) => Err(BankError::io(path, e)),
    }
}

// Temp files are created 0600; new files get the conventional 0644.
#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

fn write_temp_beside(
    path: &Path,
    contents: &[u8],
    permissions: Option<Permissions>,
) -> BankResult<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| BankError::io(dir, e))?;
    tmp.write_all(contents)
        .and_then(|()| match permissions {
            Some(perms) => tmp.as_file().set_permissions(perms),
            None => Ok(()),
        })
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| BankError::io(tmp.path(), e))?;
    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_path_suffix() {
        let p = BackupWriter::backup_path(Path::new("dir/sb.bnk"), 7);
        assert_eq!(p, PathBuf::from("dir/sb.bnk.007"));
    }

    #[test]
    fn snapshot_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bnk");
        let writer = BackupWriter::new();

        for (i, body) in [b"one", b"two", b"thr"].iter().enumerate() {
            std::fs::write(&path, body).unwrap();
            let backup = writer.snapshot(&path).unwrap().unwrap();
            assert_eq!(backup, BackupWriter::backup_path(&path, i as u32));
            assert_eq!(std::fs::read(&backup).unwrap(), *body);
        }
        assert_eq!(
            BackupWriter::next_backup_path(&path).unwrap(),
            BackupWriter::backup_path(&path, 3)
        );
    }

    #[test]
    fn snapshot_skips_existing_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bnk");
        std::fs::write(&path, b"current").unwrap();
        std::fs::write(BackupWriter::backup_path(&path, 0), b"old").unwrap();

        let backup = BackupWriter::new().snapshot(&path).unwrap().unwrap();
        assert_eq!(backup, BackupWriter::backup_path(&path, 1));
        assert_eq!(std::fs::read(BackupWriter::backup_path(&path, 0)).unwrap(), b"old");
    }

    #[test]
    fn snapshot_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = BackupWriter::new().snapshot(&dir.path().join("none.bnk")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn atomic_write_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bnk");
        std::fs::write(&path, b"before").unwrap();
        write_atomic(&path, b"after").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"after");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn rewrites_keep_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sb.bnk");
        std::fs::write(&path, b"before").unwrap();
        std::fs::set_permissions(&path, Permissions::from_mode(0o640)).unwrap();

        let backup = BackupWriter::new().snapshot(&path).unwrap().unwrap();
        write_atomic(&path, b"after").unwrap();
        assert_eq!(mode(&path), 0o640);
        assert_eq!(mode(&backup), 0o640);

        let fresh = dir.path().join("1.wem");
        write_atomic(&fresh, b"new").unwrap();
        assert_eq!(mode(&fresh), 0o644);
    }

    #[test]
    fn atomic_write_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_atomic(&dir.path().join("no/such/out.bnk"), b"x").unwrap_err();
        assert_eq!(err.category(), "IOFailure");
    }
}
