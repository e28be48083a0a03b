//! Flat sorted-run persistence for a range index
//!
//! A run file is the on-disk form of one range index: a small header
//! followed by every record concatenated in ascending key order.
//! Fixed widths mean the file needs no page structure; a reader can
//! binary-search it or, as here, load it back into a
//! [`MemRangeIndex`].
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! magic   4 bytes  "TSR1"
//! key     2 bytes  key width
//! value   2 bytes  value width
//! count   8 bytes  record count
//! records count * (key + value) bytes, ascending by key
//! ```

use crate::mem::MemRangeIndex;
use crate::range_index::RangeIndex;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tupelo_core::{Error, RecordFactory, Result};

const MAGIC: [u8; 4] = *b"TSR1";

/// Stream every record of `index` to `out` in key order.
///
/// Returns the number of records written.
pub fn write_run<W: Write>(index: &dyn RangeIndex, mut out: W) -> Result<u64> {
    let factory = index.factory();
    let count = index.len() as u64;
    out.write_all(&MAGIC)?;
    out.write_all(&(factory.key_len() as u16).to_be_bytes())?;
    out.write_all(&(factory.value_len() as u16).to_be_bytes())?;
    out.write_all(&count.to_be_bytes())?;
    let mut written = 0u64;
    for record in index.iter_all()? {
        out.write_all(record.key())?;
        out.write_all(record.value())?;
        written += 1;
    }
    if written != count {
        // The index changed under us; the header no longer matches.
        return Err(Error::storage(format!(
            "index mutated during run write: header says {count} records, wrote {written}"
        )));
    }
    out.flush()?;
    Ok(written)
}

/// Load a run produced by [`write_run`] into a fresh [`MemRangeIndex`].
///
/// Validates the magic, the widths against `factory`, strict ascending
/// key order, and that the stream holds exactly the declared records.
pub fn read_run<R: Read>(factory: RecordFactory, mut input: R) -> Result<MemRangeIndex> {
    let mut header = [0u8; 16];
    input
        .read_exact(&mut header)
        .map_err(|e| Error::corruption(format!("short run header: {e}")))?;
    if header[..4] != MAGIC {
        return Err(Error::corruption("bad run file magic"));
    }
    let key_len = u16::from_be_bytes([header[4], header[5]]) as usize;
    let value_len = u16::from_be_bytes([header[6], header[7]]) as usize;
    if key_len != factory.key_len() || value_len != factory.value_len() {
        return Err(Error::corruption(format!(
            "run widths ({key_len},{value_len}) disagree with factory ({},{})",
            factory.key_len(),
            factory.value_len()
        )));
    }
    let count = u64::from_be_bytes(header[8..16].try_into().expect("8-byte slice"));

    let index = MemRangeIndex::new(factory);
    let mut key = vec![0u8; key_len];
    let mut value = vec![0u8; value_len];
    let mut prev_key: Option<Vec<u8>> = None;
    for n in 0..count {
        input
            .read_exact(&mut key)
            .map_err(|e| Error::corruption(format!("run truncated at record {n}: {e}")))?;
        input
            .read_exact(&mut value)
            .map_err(|e| Error::corruption(format!("run truncated at record {n}: {e}")))?;
        if let Some(prev) = &prev_key {
            if prev.as_slice() >= key.as_slice() {
                return Err(Error::corruption(format!(
                    "run keys out of order at record {n}"
                )));
            }
        }
        prev_key = Some(key.clone());
        let value = if value.is_empty() {
            None
        } else {
            Some(value.as_slice())
        };
        index.insert(factory.create(&key, value)?)?;
    }
    let mut trailer = [0u8; 1];
    if input.read(&mut trailer)? != 0 {
        return Err(Error::corruption("trailing bytes after run records"));
    }
    Ok(index)
}

/// Write a run file at `path`.
pub fn save_to_path(index: &dyn RangeIndex, path: &Path) -> Result<u64> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    let written = write_run(index, &mut out)?;
    out.into_inner()
        .map_err(|e| Error::storage(format!("flushing run file: {e}")))?
        .sync_data()?;
    Ok(written)
}

/// Load a run file from `path`.
pub fn load_from_path(factory: RecordFactory, path: &Path) -> Result<MemRangeIndex> {
    let file = File::open(path)?;
    read_run(factory, BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_index(factory: RecordFactory, n: u64) -> MemRangeIndex {
        let index = MemRangeIndex::new(factory);
        for i in 0..n {
            let key = (i * 3).to_be_bytes();
            let value = [(i % 251) as u8; 2];
            index.insert(factory.create(&key, Some(&value)).unwrap()).unwrap();
        }
        index
    }

    #[test]
    fn test_run_roundtrip() {
        let factory = RecordFactory::new(8, 2);
        let index = filled_index(factory, 500);
        let mut buf = Vec::new();
        assert_eq!(write_run(&index, &mut buf).unwrap(), 500);

        let loaded = read_run(factory, buf.as_slice()).unwrap();
        assert_eq!(loaded.len(), 500);
        let a: Vec<_> = index.iter_all().unwrap().collect();
        let b: Vec<_> = loaded.iter_all().unwrap().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_run_roundtrip() {
        let factory = RecordFactory::new(8, 0);
        let index = MemRangeIndex::new(factory);
        let mut buf = Vec::new();
        write_run(&index, &mut buf).unwrap();
        let loaded = read_run(factory, buf.as_slice()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_read_rejects_bad_magic() {
        let factory = RecordFactory::new(8, 0);
        let mut buf = Vec::new();
        write_run(&MemRangeIndex::new(factory), &mut buf).unwrap();
        buf[0] = b'X';
        assert!(matches!(
            read_run(factory, buf.as_slice()),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn test_read_rejects_width_mismatch() {
        let factory = RecordFactory::new(8, 0);
        let mut buf = Vec::new();
        write_run(&MemRangeIndex::new(factory), &mut buf).unwrap();
        assert!(read_run(RecordFactory::new(16, 0), buf.as_slice()).is_err());
    }

    #[test]
    fn test_read_rejects_truncation_and_trailing() {
        let factory = RecordFactory::new(8, 2);
        let index = filled_index(factory, 10);
        let mut buf = Vec::new();
        write_run(&index, &mut buf).unwrap();

        let truncated = &buf[..buf.len() - 3];
        assert!(read_run(factory, truncated).is_err());

        let mut extended = buf.clone();
        extended.push(0);
        assert!(read_run(factory, extended.as_slice()).is_err());
    }

    #[test]
    fn test_save_and_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spo.run");
        let factory = RecordFactory::new(8, 0);
        let index = MemRangeIndex::new(factory);
        for i in 0..64u64 {
            index
                .insert(factory.key_record(&i.to_be_bytes()).unwrap())
                .unwrap();
        }
        save_to_path(&index, &path).unwrap();
        let loaded = load_from_path(factory, &path).unwrap();
        assert_eq!(loaded.len(), 64);
    }
}
