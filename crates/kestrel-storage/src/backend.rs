use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{DiskError, Result};

/// A byte-addressable random-access storage primitive.
///
/// Reads must be fully in bounds. Writes past the current end grow the backend,
/// leaving any gap zero-filled.
pub trait StorageBackend: Send {
    fn len(&mut self) -> Result<u64>;

    fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn set_len(&mut self, len: u64) -> Result<()>;
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn len(&mut self) -> Result<u64> {
        (**self).len()
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        (**self).set_len(len)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        (**self).write_at(offset, buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

fn checked_end(offset: u64, len: usize) -> Result<u64> {
    offset
        .checked_add(len as u64)
        .ok_or(DiskError::OffsetOverflow)
}

fn check_read(offset: u64, len: usize, capacity: u64) -> Result<()> {
    let end = checked_end(offset, len)?;
    if end > capacity {
        return Err(DiskError::OutOfBounds {
            offset,
            len,
            capacity,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct MemBackend {
    data: Vec<u8>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_len(len: u64) -> Result<Self> {
        let len = usize::try_from(len).map_err(|_| DiskError::OffsetOverflow)?;
        Ok(Self {
            data: vec![0; len],
        })
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl StorageBackend for MemBackend {
    fn len(&mut self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        let len = usize::try_from(len).map_err(|_| DiskError::OffsetOverflow)?;
        self.data.resize(len, 0);
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        check_read(offset, buf.len(), self.data.len() as u64)?;
        let start = offset as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        let end = checked_end(offset, buf.len())?;
        let end = usize::try_from(end).map_err(|_| DiskError::OffsetOverflow)?;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        let start = offset as usize;
        self.data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Disk image stored in a host file.
///
/// Every access seeks to the requested offset before reading or writing.
#[derive(Debug)]
pub struct StdFileBackend {
    file: File,
}

impl StdFileBackend {
    pub fn from_file(file: File) -> Self {
        Self { file }
    }

    /// Opens an existing image for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }
}

impl StorageBackend for StdFileBackend {
    fn len(&mut self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let capacity = self.len()?;
        check_read(offset, buf.len(), capacity)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        checked_end(offset, buf.len())?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_backend_write_past_end_zero_fills_gap() {
        let mut backend = MemBackend::new();
        backend.write_at(8, &[0xAA, 0xBB]).unwrap();

        assert_eq!(backend.len().unwrap(), 10);
        assert_eq!(&backend.as_slice()[..8], &[0u8; 8]);
        assert_eq!(&backend.as_slice()[8..], &[0xAA, 0xBB]);
    }

    #[test]
    fn mem_backend_read_oob_returns_out_of_bounds() {
        let mut backend = MemBackend::with_len(16).unwrap();
        let mut buf = [0u8; 8];

        let err = backend.read_at(12, &mut buf).unwrap_err();
        assert!(
            matches!(
                err,
                DiskError::OutOfBounds {
                    offset: 12,
                    len: 8,
                    capacity: 16
                }
            ),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn offset_overflow_is_reported() {
        let mut backend = MemBackend::with_len(16).unwrap();
        let mut buf = [0u8; 2];

        let err = backend.read_at(u64::MAX, &mut buf).unwrap_err();
        assert!(matches!(err, DiskError::OffsetOverflow));
    }

    #[test]
    fn boxed_backend_forwards_calls() {
        let mut backend: Box<dyn StorageBackend> = Box::new(MemBackend::with_len(4).unwrap());
        backend.write_at(0, &[1, 2, 3, 4]).unwrap();

        let mut back = [0u8; 4];
        backend.read_at(0, &mut back).unwrap();
        assert_eq!(back, [1, 2, 3, 4]);
        assert!(!backend.is_empty().unwrap());
    }
}
