//! Heap Module
//!
//! Page allocators layered over a medium.
//!
//! ## Responsibilities
//! - Grow the address space one page at a time (`BumpHeap`)
//! - Persist the allocation boundary so it survives restarts
//! - Recycle freed pages before growing further (`RecyclingHeap`)
//!
//! ## Layering
//! ```text
//!   RecyclingHeap ── cache ──▶ free chain (root page + chained nodes)
//!        │
//!        ▼
//!    BumpHeap ── header @ 0 ──▶ Medium (file / memory)
//! ```
//!
//! There are no transactions: `Session::commit()` is a no-op and
//! durability is exactly that of each individual page commit.

mod bump;
mod header;
mod recycle;

pub use bump::{BumpHeap, HeapPage, StoreFlush};
pub use header::{read_header, HeapHeader, SIGNATURE};
pub use recycle::RecyclingHeap;

use crate::error::{HeapError, Result};
use crate::page::Page;

/// A source of pages
pub trait Allocator {
    type Page: Page;

    /// Hand out a page nobody else owns
    fn allocate(&mut self) -> Result<Self::Page>;

    /// Load an allocated page by address
    fn fetch(&mut self, address: u64) -> Result<Self::Page>;

    /// Return pages for reuse
    fn free(&mut self, addresses: &[u64]) -> Result<()>;

    /// Full page length in bytes
    fn page_length(&self) -> usize;

    /// End of the allocated address space
    fn heap_size(&self) -> u64;

    /// Flush any allocator state and close the medium
    fn close(self) -> Result<()>
    where
        Self: Sized;

    /// Open a single-threaded session over this allocator
    fn session(&mut self) -> Session<'_, Self>
    where
        Self: Sized,
    {
        Session { allocator: self }
    }
}

/// Single-threaded handle over one allocator
///
/// Sessions carry no state of their own. There is nothing to roll back:
/// every page commit is already durable on its own.
pub struct Session<'a, A: Allocator> {
    allocator: &'a mut A,
}

impl<'a, A: Allocator> Session<'a, A> {
    pub fn alloc(&mut self) -> Result<A::Page> {
        self.allocator.allocate()
    }

    pub fn fetch(&mut self, address: u64) -> Result<A::Page> {
        self.allocator.fetch(address)
    }

    /// Release a page back to the allocator
    pub fn free(&mut self, page: A::Page) -> Result<()> {
        self.allocator.free(&[page.address()])
    }

    pub fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        Err(HeapError::Unsupported(
            "Rollback is not supported".to_string(),
        ))
    }
}
