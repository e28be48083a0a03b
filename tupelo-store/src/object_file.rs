//! ObjectFile - append-only store of length-prefixed byte records
//!
//! Term payloads live in an object file addressed by byte offset; a
//! record, once written, is never mutated or deleted (reclamation is a
//! whole-database compaction concern, outside this layer). Because
//! written bytes are immutable, readers may read any
//! previously-committed offset concurrently with the single appender.
//!
//! Record layout: `u32` big-endian payload length, then the payload.
//! The returned offset addresses the length prefix.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tupelo_core::{Error, Result};

/// Append-only byte store addressed by offset.
pub trait ObjectFile: Send + Sync + fmt::Debug {
    /// Append one record, returning its offset.
    fn append(&self, bytes: &[u8]) -> Result<u64>;

    /// Read the record at `offset`.
    ///
    /// An offset that does not address a record written earlier is a
    /// corruption error.
    fn read(&self, offset: u64) -> Result<Vec<u8>>;

    /// Total length in bytes (the offset the next append will get).
    fn length(&self) -> u64;

    /// Flush to durable storage, where the implementation has any.
    fn sync(&self) -> Result<()>;
}

const LEN_PREFIX: u64 = 4;

fn check_payload_len(bytes: &[u8]) -> Result<u32> {
    u32::try_from(bytes.len())
        .map_err(|_| Error::out_of_range(format!("object record of {} bytes", bytes.len())))
}

// ============================================================================
// MemObjectFile
// ============================================================================

/// In-memory object file.
#[derive(Default)]
pub struct MemObjectFile {
    buf: RwLock<Vec<u8>>,
}

impl MemObjectFile {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for MemObjectFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemObjectFile")
            .field("length", &self.buf.read().len())
            .finish()
    }
}

impl ObjectFile for MemObjectFile {
    fn append(&self, bytes: &[u8]) -> Result<u64> {
        let len = check_payload_len(bytes)?;
        let mut buf = self.buf.write();
        let offset = buf.len() as u64;
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(bytes);
        Ok(offset)
    }

    fn read(&self, offset: u64) -> Result<Vec<u8>> {
        let buf = self.buf.read();
        let start = offset as usize;
        let data_start = start
            .checked_add(LEN_PREFIX as usize)
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| Error::corruption(format!("object offset {offset} out of range")))?;
        let len =
            u32::from_be_bytes(buf[start..data_start].try_into().expect("4-byte slice")) as usize;
        let end = data_start
            .checked_add(len)
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| {
                Error::corruption(format!("object record at {offset} overruns the file"))
            })?;
        Ok(buf[data_start..end].to_vec())
    }

    fn length(&self) -> u64 {
        self.buf.read().len() as u64
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// FileObjectFile
// ============================================================================

#[derive(Debug)]
struct FileInner {
    file: File,
    len: u64,
}

/// Object file backed by a single on-disk file.
///
/// One handle serves appends and reads under a mutex; the append-only
/// contract is what makes concurrent readers safe at the trait level,
/// richer implementations can serve reads via positioned I/O.
#[derive(Debug)]
pub struct FileObjectFile {
    inner: Mutex<FileInner>,
}

impl FileObjectFile {
    /// Open (or create) the object file at `path`.
    ///
    /// Re-opening an existing file resumes appending after its last
    /// record.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            inner: Mutex::new(FileInner { file, len }),
        })
    }
}

impl ObjectFile for FileObjectFile {
    fn append(&self, bytes: &[u8]) -> Result<u64> {
        let len = check_payload_len(bytes)?;
        let mut inner = self.inner.lock();
        let offset = inner.len;
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(&len.to_be_bytes())?;
        inner.file.write_all(bytes)?;
        inner.len = offset + LEN_PREFIX + bytes.len() as u64;
        Ok(offset)
    }

    fn read(&self, offset: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        if offset + LEN_PREFIX > inner.len {
            return Err(Error::corruption(format!(
                "object offset {offset} out of range"
            )));
        }
        inner.file.seek(SeekFrom::Start(offset))?;
        let mut prefix = [0u8; LEN_PREFIX as usize];
        inner.file.read_exact(&mut prefix)?;
        let len = u32::from_be_bytes(prefix) as u64;
        if offset + LEN_PREFIX + len > inner.len {
            return Err(Error::corruption(format!(
                "object record at {offset} overruns the file"
            )));
        }
        let mut payload = vec![0u8; len as usize];
        inner.file.read_exact(&mut payload)?;
        Ok(payload)
    }

    fn length(&self) -> u64 {
        self.inner.lock().len
    }

    fn sync(&self) -> Result<()> {
        self.inner.lock().file.sync_data()?;
        Ok(())
    }
}
