//! Page Module
//!
//! Fixed-length, independently addressable regions of a medium.
//!
//! ## Responsibilities
//! - Buffer reads and writes in memory
//! - Track dirtiness per block so only modified blocks are written back
//! - Push dirty blocks to the medium through a caller-supplied flush
//!
//! ## Layering
//! ```text
//! ┌───────────────────────────────┐
//! │ OffsetPage (hides a prefix)   │   page 0: hides the heap header
//! ├───────────────────────────────┤
//! │ BlockPage (dirty per block)   │
//! │ ┌───────┬───────┬───────┐     │
//! │ │ blk 0 │ blk 1 │ blk n │     │
//! │ └───────┴───────┴───────┘     │
//! └───────────────┬───────────────┘
//!                 │ flush(block address, block)
//!                 ▼
//!              Medium
//! ```

mod block;
mod offset;

pub use block::BlockPage;
pub use offset::OffsetPage;

use crate::error::{HeapError, Result};

/// An addressable, fixed-length region with buffered writes
///
/// Writes only touch the in-memory buffer. `commit()` pushes modified
/// blocks to the medium; dropping a page without committing loses them.
pub trait Page {
    /// Position of the page in the medium (stable for its lifetime)
    fn address(&self) -> u64;

    /// Visible length in bytes
    fn length(&self) -> usize;

    /// Copy `data` into the page at offset `at`
    fn write(&mut self, at: usize, data: &[u8]) -> Result<()>;

    /// Copy `buf.len()` bytes out of the page from offset `at`
    fn read(&self, at: usize, buf: &mut [u8]) -> Result<()>;

    /// Flush dirty blocks and clear their dirty flags
    fn commit(&mut self) -> Result<()>;

    /// Read `len` bytes from offset `at` into a new buffer
    fn read_vec(&self, at: usize, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read(at, &mut buf)?;
        Ok(buf)
    }

    /// Commit and release the page
    fn close(mut self) -> Result<()>
    where
        Self: Sized,
    {
        self.commit()
    }
}

/// Receives one dirty block during `commit()`
///
/// `address` is the absolute address of the block in the medium, i.e.
/// `page.address + block_index * block_length`.
pub trait Flush {
    fn flush(&self, address: u64, block: &[u8]) -> Result<()>;
}

impl<F> Flush for F
where
    F: Fn(u64, &[u8]) -> Result<()>,
{
    fn flush(&self, address: u64, block: &[u8]) -> Result<()> {
        self(address, block)
    }
}

/// Check that `[at, at + len)` lies within `[0, length)`
pub(crate) fn check_range(at: usize, len: usize, length: usize) -> Result<()> {
    match at.checked_add(len) {
        Some(end) if end <= length => Ok(()),
        _ => Err(HeapError::OutOfRange(format!(
            "Range [{}, {}) is out of bound {}",
            at,
            at.saturating_add(len),
            length
        ))),
    }
}
