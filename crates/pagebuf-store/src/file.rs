//! File-backed store.

use std::fs::File as StdFile;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use pagebuf_common::types::PageSize;
use tracing::{debug, trace};

use super::error::{StoreError, StoreResult};
use super::options::OpenOptions;
use super::store::{check_range, PageStore};

/// A backing store on top of a regular file.
///
/// Reads that run past the end of the file are zero-filled, so the cache can
/// load the page that holds the current end of file. The end-of-address is
/// kept in memory and starts at the file length; setting it does not resize
/// the file.
pub struct FileStore {
    /// `None` once closed.
    file: Option<StdFile>,
    path: PathBuf,
    writable: bool,
    sync_metadata: bool,
    eoa: u64,
    alignment: Option<PageSize>,
}

impl FileStore {
    /// Opens a file with the specified options.
    pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = options
            .to_std_options()
            .open(&path)
            .map_err(|e| StoreError::from_io_with_path(e, &path))?;
        let eoa = file.metadata()?.len();

        debug!(path = %path.display(), eoa, "opened file store");

        Ok(Self {
            file: Some(file),
            path,
            writable: options.write,
            sync_metadata: options.sync_metadata,
            eoa,
            alignment: None,
        })
    }

    /// Opens a file for reading and writing, creating it if necessary.
    pub fn create(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open(path, OpenOptions::for_create())
    }

    /// Rejects requests that are not aligned to `page_size`.
    #[must_use]
    pub fn with_alignment(mut self, page_size: PageSize) -> Self {
        self.alignment = Some(page_size);
        self
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the store was opened with write access.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    fn file(&self) -> StoreResult<&StdFile> {
        self.file.as_ref().ok_or(StoreError::Closed)
    }

    fn file_mut(&mut self) -> StoreResult<&mut StdFile> {
        self.file.as_mut().ok_or(StoreError::Closed)
    }

    fn check_writable(&self, operation: &'static str) -> StoreResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(StoreError::InvalidOperation {
                operation,
                mode: "read-only",
            })
        }
    }
}

impl PageStore for FileStore {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> StoreResult<()> {
        check_range(offset, buf.len(), self.alignment)?;
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(offset))?;

        let mut total = 0;
        while total < buf.len() {
            match file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        // Past EOF.
        buf[total..].fill(0);

        trace!(offset, len = buf.len(), from_file = total, "file store read");
        Ok(())
    }

    fn write(&mut self, offset: u64, buf: &[u8]) -> StoreResult<()> {
        self.check_writable("write")?;
        check_range(offset, buf.len(), self.alignment)?;
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(offset))?;

        let mut total = 0;
        while total < buf.len() {
            match file.write(&buf[total..]) {
                Ok(0) => return Err(StoreError::short_write(buf.len(), total)),
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        trace!(offset, len = buf.len(), "file store write");
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        let sync_metadata = self.sync_metadata;
        let writable = self.writable;
        let file = self.file_mut()?;
        if !writable {
            return Ok(());
        }
        file.flush()?;
        if sync_metadata {
            file.sync_all()?;
        } else {
            file.sync_data()?;
        }
        Ok(())
    }

    fn eoa(&self) -> u64 {
        self.eoa
    }

    fn set_eoa(&mut self, addr: u64) -> StoreResult<()> {
        self.file()?;
        self.eoa = addr;
        Ok(())
    }

    fn eof(&self) -> StoreResult<u64> {
        Ok(self.file()?.metadata()?.len())
    }

    fn close(&mut self) -> StoreResult<()> {
        let file = self.file.take().ok_or(StoreError::Closed)?;
        if self.writable {
            file.sync_all()?;
        }
        debug!(path = %self.path.display(), "closed file store");
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("writable", &self.writable)
            .field("eoa", &self.eoa)
            .field("open", &self.file.is_some())
            .finish()
    }
}
