//! Recycling allocator
//!
//! Wraps another allocator and reuses freed pages before growing the heap.
//!
//! ## Allocation order
//! 1. In-memory cache, most recently freed first
//! 2. Addresses pulled back from the persisted free chain
//! 3. A brand-new page from the wrapped allocator
//!
//! ## Free chain
//! The root page is the head node. When it fills up, its whole content is
//! copied into one of the addresses being freed, which becomes the chained
//! predecessor, and the root is reset to `count = 0, next = <that page>`.

use crate::codec::{self, ADDRESS_SIZE};
use crate::error::{HeapError, Result};
use crate::freeset::chain::{self, ChainHeader, CHAIN_HEADER_LEN};
use crate::page::Page;

use super::Allocator;

/// Allocator that recycles freed pages through a persisted free chain
///
/// The cache is not synchronized; a recycling heap belongs to one thread.
pub struct RecyclingHeap<A: Allocator> {
    /// Wrapped allocator for fresh pages
    base: A,
    /// Address of the head chain node
    root: u64,
    /// Cache size that triggers a flush to the chain
    cache_limit: usize,
    /// Freed addresses not yet persisted (LIFO)
    cache: Vec<u64>,
}

impl<A: Allocator> RecyclingHeap<A> {
    /// Open the free chain rooted at `root`
    ///
    /// A root page without the chain signature is initialized as an empty
    /// node and committed.
    pub fn open(mut base: A, root: u64, cache_limit: usize) -> Result<Self> {
        let mut page = base.fetch(root)?;
        if page.length() < CHAIN_HEADER_LEN + ADDRESS_SIZE {
            return Err(HeapError::Config(format!(
                "Root page of {} bytes cannot hold a free chain node",
                page.length()
            )));
        }

        let header = ChainHeader::read_from(&page)?;
        if header.is_initialized() {
            if header.count() > chain::capacity(page.length()) {
                return Err(HeapError::Corruption(format!(
                    "Root node count {} exceeds capacity {}",
                    header.count(),
                    chain::capacity(page.length())
                )));
            }
            if header.count() == 0 && header.next().is_some() {
                // Either the last flush ended on a demotion or the store was
                // not closed cleanly. The chain is trusted as-is.
                tracing::warn!(
                    "Free chain root {} is empty but chained to {:?}",
                    root,
                    header.next()
                );
            }
            tracing::debug!(
                "Opened free chain at {}: count={}, next={:?}",
                root,
                header.count(),
                header.next()
            );
        } else {
            ChainHeader::empty().write_to(&mut page)?;
            page.commit()?;
            tracing::info!("Initialized free chain at {}", root);
        }

        Ok(Self {
            base,
            root,
            cache_limit,
            cache: Vec::new(),
        })
    }

    /// Hand out a recycled page if one exists, otherwise a fresh one
    ///
    /// Recycled pages keep whatever content they held.
    pub fn allocate(&mut self) -> Result<A::Page> {
        if self.cache.is_empty() {
            self.reload()?;
        }
        let Some(&address) = self.cache.last() else {
            return self.base.allocate();
        };

        // The address stays cached until its page is loaded
        let page = self.base.fetch(address)?;
        self.cache.pop();
        tracing::trace!("Reusing page {}", address);
        Ok(page)
    }

    /// Return pages for reuse
    ///
    /// Every address must be an allocated page; nothing is cached when one
    /// is rejected. Once the cache grows past `cache_limit` it is flushed to
    /// the chain.
    pub fn free(&mut self, addresses: &[u64]) -> Result<()> {
        let page_length = self.base.page_length() as u64;
        let heap_size = self.base.heap_size();

        for (i, &address) in addresses.iter().enumerate() {
            if address == self.root {
                return Err(HeapError::InvalidAddress(format!(
                    "Page {} is the free chain root",
                    address
                )));
            }
            if address == 0 {
                return Err(HeapError::InvalidAddress(
                    "Page 0 holds the heap header and is never recycled".to_string(),
                ));
            }
            if address % page_length != 0 {
                return Err(HeapError::InvalidAddress(format!(
                    "Address {} is not aligned to page length {}",
                    address, page_length
                )));
            }
            let allocated = address
                .checked_add(page_length)
                .is_some_and(|end| end <= heap_size);
            if !allocated {
                return Err(HeapError::InvalidAddress(format!(
                    "Page {} is not allocated",
                    address
                )));
            }
            if self.cache.contains(&address) || addresses[..i].contains(&address) {
                return Err(HeapError::InvalidAddress(format!(
                    "Page {} is already free",
                    address
                )));
            }
        }

        self.cache.extend_from_slice(addresses);
        if self.cache.len() > self.cache_limit {
            self.flush()?;
        }
        Ok(())
    }

    /// Persist every cached address into the free chain
    pub fn flush(&mut self) -> Result<()> {
        if self.cache.is_empty() {
            return Ok(());
        }

        let mut root = self.base.fetch(self.root)?;
        let mut header = ChainHeader::read_from(&root)?;
        let capacity = chain::capacity(root.length());

        let mut done = 0;
        while done < self.cache.len() {
            let count = header.count();
            if count < capacity {
                let num = (capacity - count).min(self.cache.len() - done);
                chain::write_addresses(&mut root, count, &self.cache[done..done + num])?;
                header.count = (count + num) as i32;
                done += num;
                continue;
            }

            // Root is full: demote its content into a freed page
            let next = self.cache[done];
            header.write_to(&mut root)?;
            let content = root.read_vec(0, root.length())?;

            let mut node = self.base.fetch(next)?;
            node.write(0, &content)?;
            node.commit()?;

            header = ChainHeader {
                next: codec::address_word(next)?,
                count: 0,
                ..header
            };
            done += 1;
            tracing::debug!("Demoted free chain root {} into {}", self.root, next);
        }

        header.write_to(&mut root)?;
        root.commit()?;

        tracing::debug!(
            "Flushed {} freed pages to chain at {}",
            self.cache.len(),
            self.root
        );
        self.cache.clear();
        Ok(())
    }

    /// Flush the cache and close the wrapped allocator
    pub fn close(mut self) -> Result<()> {
        let flushed = self.flush();
        let closed = self.base.close();
        flushed.and(closed)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn root(&self) -> u64 {
        self.root
    }

    pub fn cache_limit(&self) -> usize {
        self.cache_limit
    }

    /// Freed addresses not yet persisted
    pub fn cached(&self) -> &[u64] {
        &self.cache
    }

    /// Live address count of the root chain node
    pub fn persisted_count(&mut self) -> Result<usize> {
        let root = self.base.fetch(self.root)?;
        Ok(ChainHeader::read_from(&root)?.count())
    }

    pub fn base(&self) -> &A {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut A {
        &mut self.base
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Refill the cache from the persisted chain
    ///
    /// Takes up to `cache_limit` addresses off the tail of the root node.
    /// An empty root chained to a predecessor absorbs that predecessor's
    /// content; the predecessor page itself becomes reusable.
    fn reload(&mut self) -> Result<usize> {
        let mut root = self.base.fetch(self.root)?;
        let mut header = ChainHeader::read_from(&root)?;

        let count = header.count();
        if count > 0 {
            let take = count.min(self.cache_limit.max(1));
            let addresses = chain::read_addresses(&root, count - take, take)?;

            header.count = (count - take) as i32;
            header.write_to(&mut root)?;
            root.commit()?;

            tracing::debug!("Reloaded {} pages from free chain", take);
            self.cache.extend(addresses);
            return Ok(take);
        }

        if let Some(next) = header.next() {
            let node = self.base.fetch(next)?;
            let content = node.read_vec(0, root.length())?;
            root.write(0, &content)?;
            root.commit()?;

            tracing::debug!("Absorbed chain node {} into root {}", next, self.root);
            self.cache.push(next);
            return Ok(1);
        }

        Ok(0)
    }
}

impl<A: Allocator> Allocator for RecyclingHeap<A> {
    type Page = A::Page;

    fn allocate(&mut self) -> Result<Self::Page> {
        RecyclingHeap::allocate(self)
    }

    fn fetch(&mut self, address: u64) -> Result<Self::Page> {
        self.base.fetch(address)
    }

    fn free(&mut self, addresses: &[u64]) -> Result<()> {
        RecyclingHeap::free(self, addresses)
    }

    fn page_length(&self) -> usize {
        self.base.page_length()
    }

    fn heap_size(&self) -> u64 {
        self.base.heap_size()
    }

    fn close(self) -> Result<()> {
        RecyclingHeap::close(self)
    }
}
