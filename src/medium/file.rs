//! File-backed medium

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::SyncStrategy;
use crate::error::{HeapError, Result};

use super::Medium;

/// Medium backed by a single file
///
/// The file handle sits behind a mutex because every operation is a
/// seek followed by a read or write.
pub struct FileMedium {
    path: PathBuf,
    file: Mutex<Option<File>>,
    sync_strategy: SyncStrategy,
}

impl FileMedium {
    /// Open or create the file at `path`
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        tracing::debug!("Opened file medium {:?} ({:?})", path, sync_strategy);

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(Some(file)),
            sync_strategy,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file length in bytes
    pub fn len(&self) -> Result<u64> {
        let guard = self.file.lock();
        let file = guard.as_ref().ok_or(HeapError::Closed)?;
        Ok(file.metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Medium for FileMedium {
    fn read(&self, at: u64, buf: &mut [u8]) -> Result<()> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(HeapError::Closed)?;

        // Anything past EOF reads as zero
        buf.fill(0);
        file.seek(SeekFrom::Start(at))?;

        let mut done = 0;
        while done < buf.len() {
            match file.read(&mut buf[done..]) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn write(&self, at: u64, data: &[u8]) -> Result<()> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(HeapError::Closed)?;

        file.seek(SeekFrom::Start(at))?;
        file.write_all(data)?;

        if self.sync_strategy == SyncStrategy::EveryWrite {
            file.sync_data()?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let file = self.file.lock().take().ok_or(HeapError::Closed)?;
        file.sync_all()?;
        tracing::debug!("Closed file medium {:?}", self.path);
        Ok(())
    }
}
