//! On-disk layout of a database.
//!
//! A database at `<path>` owns three names:
//!
//! ```text
//! <path>           # the log
//! <path>.lock      # advisory lock held while the database is open
//! <path>.compact   # scratch file while compaction runs
//! ```
//!
//! The lock is an exclusive `fs2` lock, so a second open of the same path,
//! from this process or another, fails with `DatabaseLocked` once the lock
//! timeout runs out.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Paths of one database plus the lock that proves ownership of them.
#[derive(Debug)]
pub(crate) struct StoreFiles {
    path: PathBuf,
    lock_path: PathBuf,
    lock_file: Option<File>,
}

impl StoreFiles {
    /// Takes the lock for `path`, retrying until `timeout` has elapsed.
    pub(crate) fn lock(path: &Path, timeout: Duration) -> CoreResult<Self> {
        let lock_path = sibling(path, "lock");
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        let deadline = Instant::now() + timeout;
        loop {
            if lock_file.try_lock_exclusive().is_ok() {
                break;
            }
            if Instant::now() >= deadline {
                return Err(CoreError::DatabaseLocked);
            }
            thread::sleep(LOCK_RETRY_INTERVAL);
        }
        debug!(lock = %lock_path.display(), "database lock acquired");

        Ok(Self {
            path: path.to_path_buf(),
            lock_path,
            lock_file: Some(lock_file),
        })
    }

    pub(crate) fn log_path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn compact_path(&self) -> PathBuf {
        sibling(&self.path, "compact")
    }

    /// Writes `data` to the scratch file and syncs it.
    pub(crate) fn write_compacted(&self, data: &[u8]) -> CoreResult<PathBuf> {
        let temp_path = self.compact_path();
        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        Ok(temp_path)
    }

    /// Atomically moves the scratch file over the log.
    ///
    /// The rename is not durable until [`StoreFiles::sync_directory`] runs.
    pub(crate) fn install_compacted(&self, temp_path: &Path) -> CoreResult<()> {
        fs::rename(temp_path, &self.path)?;
        Ok(())
    }

    /// Releases the lock. Safe to call more than once.
    pub(crate) fn unlock(&mut self) -> CoreResult<()> {
        if let Some(file) = self.lock_file.take() {
            FileExt::unlock(&file)?;
            debug!(lock = %self.lock_path.display(), "database lock released");
        }
        Ok(())
    }

    #[cfg(unix)]
    pub(crate) fn sync_directory(&self) -> CoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        File::open(dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    pub(crate) fn sync_directory(&self) -> CoreResult<()> {
        // NTFS journals metadata; directory handles cannot be fsynced.
        Ok(())
    }
}

impl Drop for StoreFiles {
    fn drop(&mut self) {
        let _ = self.unlock();
    }
}

/// `<path>.<suffix>`, keeping any existing extension.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
