//! Tests for Medium implementations
//!
//! These tests verify:
//! - Zero-filled reads beyond written data
//! - Auto-expanding writes
//! - Persistence of the file medium across reopen
//! - Failure of every operation after close

use std::path::PathBuf;

use pageheap::medium::{FileMedium, Medium, MemoryMedium};
use pageheap::{HeapError, SyncStrategy};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.bin");
    (temp_dir, path)
}

// =============================================================================
// Memory Medium Tests
// =============================================================================

#[test]
fn test_memory_read_empty_is_zero() {
    let medium = MemoryMedium::new();

    let data = medium.read_vec(100, 16).unwrap();

    assert_eq!(data, vec![0u8; 16]);
    assert!(medium.is_empty());
}

#[test]
fn test_memory_write_expands() {
    let medium = MemoryMedium::new();

    medium.write(1000, b"Pecunia non olet.").unwrap();

    assert_eq!(medium.len(), 1017);
    assert_eq!(medium.read_vec(1000, 17).unwrap(), b"Pecunia non olet.");
    assert_eq!(medium.read_vec(0, 8).unwrap(), vec![0u8; 8]);
}

#[test]
fn test_memory_read_straddling_end_is_zero_filled() {
    let medium = MemoryMedium::new();
    medium.write(0, b"abcd").unwrap();

    let data = medium.read_vec(2, 6).unwrap();

    assert_eq!(data, b"cd\0\0\0\0");
}

#[test]
fn test_memory_clones_share_buffer() {
    let medium = MemoryMedium::new();
    let observer = medium.clone();

    medium.write(8, b"shared").unwrap();

    assert_eq!(&observer.snapshot()[8..14], b"shared");
}

#[test]
fn test_memory_from_bytes() {
    let medium = MemoryMedium::from_bytes(b"seeded image");

    assert_eq!(medium.read_vec(0, 6).unwrap(), b"seeded");
    assert_eq!(medium.len(), 12);
}

#[test]
fn test_memory_closed_rejects_operations() {
    let medium = MemoryMedium::new();
    medium.write(0, b"kept").unwrap();
    medium.close().unwrap();

    assert!(medium.is_closed());
    assert!(matches!(medium.read_vec(0, 4), Err(HeapError::Closed)));
    assert!(matches!(medium.write(0, b"x"), Err(HeapError::Closed)));

    // Snapshot stays available for inspection
    assert_eq!(&medium.snapshot()[..], b"kept");
}

// =============================================================================
// File Medium Tests
// =============================================================================

#[test]
fn test_file_open_creates_file() {
    let (_temp, path) = setup_temp_file();
    assert!(!path.exists());

    let medium = FileMedium::open(&path, SyncStrategy::OnClose).unwrap();

    assert!(path.exists());
    assert!(medium.is_empty().unwrap());
    assert_eq!(medium.path(), path.as_path());
}

#[test]
fn test_file_read_past_eof_is_zero() {
    let (_temp, path) = setup_temp_file();
    let medium = FileMedium::open(&path, SyncStrategy::OnClose).unwrap();
    medium.write(0, b"head").unwrap();

    let data = medium.read_vec(2, 10).unwrap();

    assert_eq!(&data[..2], b"ad");
    assert_eq!(&data[2..], &[0u8; 8]);
}

#[test]
fn test_file_write_expands() {
    let (_temp, path) = setup_temp_file();
    let medium = FileMedium::open(&path, SyncStrategy::EveryWrite).unwrap();

    medium.write(4096, b"tail").unwrap();

    assert_eq!(medium.len().unwrap(), 4100);
    assert_eq!(medium.read_vec(4096, 4).unwrap(), b"tail");
    assert_eq!(medium.read_vec(0, 4).unwrap(), vec![0u8; 4]);
}

#[test]
fn test_file_persists_across_reopen() {
    let (_temp, path) = setup_temp_file();

    {
        let medium = FileMedium::open(&path, SyncStrategy::OnClose).unwrap();
        medium.write(512, b"durable").unwrap();
        medium.close().unwrap();
    }

    let medium = FileMedium::open(&path, SyncStrategy::OnClose).unwrap();
    assert_eq!(medium.read_vec(512, 7).unwrap(), b"durable");
}

#[test]
fn test_file_closed_rejects_operations() {
    let (_temp, path) = setup_temp_file();
    let medium = FileMedium::open(&path, SyncStrategy::OnClose).unwrap();
    medium.close().unwrap();

    assert!(matches!(medium.read_vec(0, 1), Err(HeapError::Closed)));
    assert!(matches!(medium.write(0, b"x"), Err(HeapError::Closed)));
    assert!(matches!(medium.close(), Err(HeapError::Closed)));
}
