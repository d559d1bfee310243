//! Byte-addressed storage backends for Kestrel's emulated drives.
//!
//! Drive models address media in bytes (an ATA driver turns sector numbers into
//! byte offsets before touching storage). This crate provides:
//!
//! - [`StorageBackend`]: resizable, byte-addressed random access storage
//! - [`MemBackend`]: a `Vec<u8>` backed implementation, mostly for tests
//! - [`StdFileBackend`]: a `std::fs::File` backed implementation for disk images

mod backend;
mod error;

pub use backend::{MemBackend, StdFileBackend, StorageBackend};
pub use error::{DiskError, Result};

/// Size of one ATA sector in bytes.
pub const SECTOR_SIZE: usize = 512;
