//! Medium Module
//!
//! Raw byte-addressable backing stores underneath the page heap.
//!
//! ## Contract
//! - `read(at, buf)` fills exactly `buf.len()` bytes, zero-filling anything
//!   past what has been written
//! - `write(at, data)` persists exactly `data` at `at`, growing the medium
//!   when `at + data.len()` exceeds the current size
//! - `close()` releases the underlying resource; every later read or write
//!   fails with `HeapError::Closed`
//!
//! Implementations serialize their own operations internally but offer no
//! atomicity across calls.

mod file;
mod memory;

pub use file::FileMedium;
pub use memory::MemoryMedium;

use crate::error::Result;

/// Offset-addressed, auto-expanding byte medium
pub trait Medium: Send + Sync {
    /// Read `buf.len()` bytes starting at `at`
    fn read(&self, at: u64, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `at`
    fn write(&self, at: u64, data: &[u8]) -> Result<()>;

    /// Release the medium
    fn close(&self) -> Result<()>;

    /// Read `len` bytes starting at `at` into a new buffer
    fn read_vec(&self, at: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read(at, &mut buf)?;
        Ok(buf)
    }
}
