//! Bump allocator
//!
//! Append-only page allocator that persists its own boundary in a header
//! at address 0.
//!
//! ## States
//! ```text
//!  uninitialized medium ──open──▶ open ──close──▶ closed
//!  (no signature: write a        (header validated,   (every call fails
//!   fresh header, size 0)         boundary restored)   with Closed)
//! ```

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{HeapError, Result};
use crate::medium::{FileMedium, Medium};
use crate::page::{BlockPage, Flush, OffsetPage, Page};

use super::header::HeapHeader;
use super::Allocator;

/// Page handed out by a bump heap
///
/// Page 0 hides the metadata region; every other page has `skip == 0`.
pub type HeapPage<M> = OffsetPage<BlockPage<StoreFlush<M>>>;

/// Append-only page allocator over a generic medium
///
/// ## Concurrency
/// - The heap boundary lives behind a single store-scoped mutex
/// - `allocate()` bumps and persists the boundary inside that critical
///   section, so concurrent callers never receive overlapping pages
/// - `fetch()` reads the boundary under the same mutex for its bounds check
/// - Page buffers are not protected; a page belongs to whoever holds it
///
/// Clones share the same store.
pub struct BumpHeap<M: Medium> {
    store: Arc<Store<M>>,
}

struct Store<M> {
    medium: M,
    block_length: usize,
    page_span: usize,
    metadata_length: usize,
    state: Mutex<HeapState>,
}

struct HeapState {
    header: HeapHeader,
    closed: bool,
}

impl<M: Medium> Clone for BumpHeap<M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl BumpHeap<FileMedium> {
    /// Open or create a file-backed heap (convenience method)
    pub fn open_file(path: &Path, config: &Config) -> Result<Self> {
        let medium = FileMedium::open(path, config.sync_strategy)?;
        Self::open(medium, config)
    }
}

impl<M: Medium> BumpHeap<M> {
    /// Open a heap on `medium`
    ///
    /// On open:
    /// 1. Read the metadata region at address 0
    /// 2. No signature: write a fresh header with heap size 0
    /// 3. Signature present: page and metadata lengths must match, boundary
    ///    is restored
    pub fn open(medium: M, config: &Config) -> Result<Self> {
        config.validate()?;
        let page_length = config.page_length();

        let bytes = medium.read_vec(0, config.metadata_length)?;
        let existing = HeapHeader::decode(&bytes)?;

        let header = if existing.is_initialized() {
            if existing.page_length != page_length as u64 {
                return Err(HeapError::ConfigMismatch(format!(
                    "Page length mismatch: expected {}, found {}",
                    page_length, existing.page_length
                )));
            }
            if existing.metadata_length != config.metadata_length as u64 {
                return Err(HeapError::ConfigMismatch(format!(
                    "Metadata length mismatch: expected {}, found {}",
                    config.metadata_length, existing.metadata_length
                )));
            }
            if existing.heap_size % page_length as u64 != 0 {
                return Err(HeapError::Corruption(format!(
                    "Heap size {} is not a multiple of page length {}",
                    existing.heap_size, page_length
                )));
            }
            tracing::info!(
                "Reopened heap: page_length={}, heap_size={}",
                page_length,
                existing.heap_size
            );
            existing
        } else {
            let header = HeapHeader::new(page_length, config.metadata_length);
            medium.write(0, &header.encode(config.metadata_length)?)?;
            tracing::info!("Initialized heap: page_length={}", page_length);
            header
        };

        Ok(Self {
            store: Arc::new(Store {
                medium,
                block_length: config.block_length,
                page_span: config.page_span,
                metadata_length: config.metadata_length,
                state: Mutex::new(HeapState {
                    header,
                    closed: false,
                }),
            }),
        })
    }

    /// Append a fresh all-zero page at the current boundary
    ///
    /// The new boundary is persisted before the page is returned.
    pub fn allocate(&self) -> Result<HeapPage<M>> {
        let page_length = self.page_length() as u64;

        let address = {
            let mut state = self.store.state.lock();
            if state.closed {
                return Err(HeapError::Closed);
            }

            let mut next = state.header;
            next.heap_size += page_length;
            self.store
                .medium
                .write(0, &next.encode(self.store.metadata_length)?)?;

            let address = state.header.heap_size;
            state.header = next;
            address
        };

        tracing::trace!("Allocated page {}", address);

        let page = BlockPage::zeroed(
            address,
            self.store.block_length,
            self.store.page_span,
            self.flusher(),
        )?;
        self.wrap(page)
    }

    /// Load a previously allocated page
    pub fn fetch(&self, address: u64) -> Result<HeapPage<M>> {
        let page_length = self.page_length() as u64;
        if address % page_length != 0 {
            return Err(HeapError::OutOfRange(format!(
                "Address {} is not aligned to page length {}",
                address, page_length
            )));
        }

        {
            let state = self.store.state.lock();
            if state.closed {
                return Err(HeapError::Closed);
            }
            let allocated = address
                .checked_add(page_length)
                .is_some_and(|end| end <= state.header.heap_size);
            if !allocated {
                return Err(HeapError::OutOfRange(format!(
                    "Page {} is not allocated",
                    address
                )));
            }
        }

        let block_length = self.store.block_length;
        let mut blocks = Vec::with_capacity(self.store.page_span);
        for index in 0..self.store.page_span {
            let at = address + (index * block_length) as u64;
            blocks.push(self.store.medium.read_vec(at, block_length)?);
        }

        // Header bytes are never visible as data
        if address == 0 {
            blocks[0][..self.store.metadata_length].fill(0);
        }

        tracing::trace!("Fetched page {}", address);

        let page = BlockPage::new(address, blocks, self.flusher())?;
        self.wrap(page)
    }

    /// Write back the final header and close the medium
    pub fn close(&self) -> Result<()> {
        let mut state = self.store.state.lock();
        if state.closed {
            return Err(HeapError::Closed);
        }
        state.closed = true;

        let written = state
            .header
            .encode(self.store.metadata_length)
            .and_then(|bytes| self.store.medium.write(0, &bytes));
        let closed = self.store.medium.close();

        tracing::info!("Closed heap at heap_size={}", state.header.heap_size);
        written.and(closed)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn page_length(&self) -> usize {
        self.store.block_length * self.store.page_span
    }

    pub fn block_length(&self) -> usize {
        self.store.block_length
    }

    pub fn metadata_length(&self) -> usize {
        self.store.metadata_length
    }

    /// Current allocation boundary in bytes
    pub fn heap_size(&self) -> u64 {
        self.store.state.lock().header.heap_size
    }

    /// Number of pages allocated so far
    pub fn page_count(&self) -> u64 {
        self.heap_size() / self.page_length() as u64
    }

    /// Creation time of the store (unix seconds)
    pub fn created_at(&self) -> u64 {
        self.store.state.lock().header.created_at
    }

    pub fn is_closed(&self) -> bool {
        self.store.state.lock().closed
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn flusher(&self) -> StoreFlush<M> {
        StoreFlush {
            store: Arc::clone(&self.store),
        }
    }

    fn wrap(&self, page: BlockPage<StoreFlush<M>>) -> Result<HeapPage<M>> {
        if page.address() == 0 {
            OffsetPage::new(page, self.store.metadata_length)
        } else {
            Ok(OffsetPage::transparent(page))
        }
    }
}

impl<M: Medium> Allocator for BumpHeap<M> {
    type Page = HeapPage<M>;

    fn allocate(&mut self) -> Result<Self::Page> {
        BumpHeap::allocate(self)
    }

    fn fetch(&mut self, address: u64) -> Result<Self::Page> {
        BumpHeap::fetch(self, address)
    }

    /// Bump heaps never reclaim storage; use `RecyclingHeap` for reuse
    fn free(&mut self, _addresses: &[u64]) -> Result<()> {
        Err(HeapError::Unsupported(
            "A bump heap cannot free pages".to_string(),
        ))
    }

    fn page_length(&self) -> usize {
        BumpHeap::page_length(self)
    }

    fn heap_size(&self) -> u64 {
        BumpHeap::heap_size(self)
    }

    fn close(self) -> Result<()> {
        BumpHeap::close(&self)
    }
}

/// Flush target for pages handed out by a bump heap
///
/// Writes a dirty block back to the medium after checking it lies inside
/// the allocated region. Block 0 of page 0 gets the live header overlaid
/// so a page commit never clobbers the metadata.
pub struct StoreFlush<M> {
    store: Arc<Store<M>>,
}

impl<M: Medium> Flush for StoreFlush<M> {
    fn flush(&self, address: u64, block: &[u8]) -> Result<()> {
        let state = self.store.state.lock();
        if state.closed {
            return Err(HeapError::Closed);
        }

        let allocated = address
            .checked_add(block.len() as u64)
            .is_some_and(|end| end <= state.header.heap_size);
        if !allocated {
            return Err(HeapError::OutOfRange(format!(
                "Block {} is not allocated",
                address
            )));
        }

        if address == 0 {
            let metadata_length = self.store.metadata_length;
            let mut data = block.to_vec();
            data[..metadata_length].copy_from_slice(&state.header.encode(metadata_length)?);
            return self.store.medium.write(0, &data);
        }
        self.store.medium.write(address, block)
    }
}
