#![cfg(not(target_arch = "wasm32"))]

use std::io::Write as _;

use kestrel_storage::{DiskError, StdFileBackend, StorageBackend, SECTOR_SIZE};

#[test]
fn std_file_backend_set_len_write_read_roundtrip() {
    let file = tempfile::tempfile().unwrap();
    let mut backend = StdFileBackend::from_file(file);

    backend.set_len(4096).unwrap();
    assert_eq!(backend.len().unwrap(), 4096);

    let data = b"hello std file backend";
    backend.write_at(123, data).unwrap();

    let mut back = vec![0u8; data.len()];
    backend.read_at(123, &mut back).unwrap();
    assert_eq!(back, data);
}

#[test]
fn std_file_backend_write_past_end_grows_file() {
    let file = tempfile::tempfile().unwrap();
    let mut backend = StdFileBackend::from_file(file);

    let write_offset = 8 * SECTOR_SIZE as u64;
    let data = vec![0x5Au8; SECTOR_SIZE];
    backend.write_at(write_offset, &data).unwrap();

    assert_eq!(backend.len().unwrap(), write_offset + data.len() as u64);

    // The hole before the write reads back as zeros.
    let mut hole = [0xAAu8; 32];
    backend.read_at(0, &mut hole).unwrap();
    assert!(hole.iter().all(|b| *b == 0));
}

#[test]
fn std_file_backend_read_oob_returns_out_of_bounds() {
    let file = tempfile::tempfile().unwrap();
    let mut backend = StdFileBackend::from_file(file);

    backend.set_len(1024).unwrap();

    let mut buf = [0u8; 200];
    let err = backend.read_at(900, &mut buf).unwrap_err();
    assert!(matches!(err, DiskError::OutOfBounds { .. }));
}

#[test]
fn std_file_backend_open_reads_existing_contents() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(&[0x11; SECTOR_SIZE]).unwrap();
    tmp.write_all(&[0x22; SECTOR_SIZE]).unwrap();
    tmp.flush().unwrap();

    let mut backend = StdFileBackend::open(tmp.path()).unwrap();
    assert_eq!(backend.len().unwrap(), 2 * SECTOR_SIZE as u64);

    let mut sector = [0u8; SECTOR_SIZE];
    backend.read_at(SECTOR_SIZE as u64, &mut sector).unwrap();
    assert!(sector.iter().all(|b| *b == 0x22));
}

#[test]
fn std_file_backend_open_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = StdFileBackend::open(dir.path().join("missing.img")).unwrap_err();
    assert!(matches!(err, DiskError::Io(_)), "unexpected error: {err:?}");
}
