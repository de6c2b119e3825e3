//! Active log file handle

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{CaskError, Result};

/// Append-only log file with positional reads
///
/// The handle is `None` only after `close()`; a merge swap that fails between
/// closing and reopening leaves it that way and every access reports
/// `LogUnavailable`.
#[derive(Debug)]
pub struct ActiveLog {
    path: PathBuf,
    file: Option<File>,
    /// Current write offset, always equal to the file length
    size: u64,
}

impl ActiveLog {
    /// Open the log for append, creating it if absent
    pub fn open(path: &Path) -> Result<Self> {
        let file = Self::open_file(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            size,
        })
    }

    /// Append `bytes` at the end of the log
    ///
    /// Returns the offset the bytes started at. On failure the write offset is
    /// resynchronised from the file length so a partial write is left as
    /// unreferenced dead space.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        let offset = self.size;
        let mut file = self.handle()?;

        if let Err(e) = file.write_all(bytes) {
            if let Ok(meta) = file.metadata() {
                self.size = meta.len();
            }
            return Err(e.into());
        }

        self.size += bytes.len() as u64;
        Ok(offset)
    }

    /// Fill `buf` from the log starting at `offset`
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        read_exact_at(self.handle()?, buf, offset)?;
        Ok(())
    }

    /// Flush file data to stable storage
    pub fn sync(&self) -> Result<()> {
        self.handle()?.sync_data()?;
        Ok(())
    }

    /// Cut the file down to `len` bytes (used to drop a torn tail)
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        let file = self.handle()?;
        file.set_len(len)?;
        file.sync_all()?;
        self.size = len;
        Ok(())
    }

    /// Sync and release the handle
    pub fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Open the file at the same path again after `close()`
    pub fn reopen(&mut self) -> Result<()> {
        let file = Self::open_file(&self.path)?;
        self.size = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    /// Current write offset (== file length)
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn handle(&self) -> Result<&File> {
        self.file.as_ref().ok_or(CaskError::LogUnavailable)
    }

    fn open_file(path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                let rest = buf;
                buf = &mut rest[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
