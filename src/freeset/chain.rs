//! Free-list chain node
//!
//! Each node occupies a whole page: a small header followed by a flat
//! array of page addresses.
//!
//! ## Node Layout (big-endian)
//! ```text
//! ┌───────────────┬───────────────┬───────────┬──────────────────────────┐
//! │ Signature (4) │ Next (8)      │ Count (4) │ Address (8) × count ...  │
//! └───────────────┴───────────────┴───────────┴──────────────────────────┘
//! ```
//! `Next` is -1 when the node terminates the chain.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::codec::{self, ADDRESS_SIZE};
use crate::error::{HeapError, Result};
use crate::heap::Allocator;
use crate::page::Page;

/// Marks an initialized chain node ("FREE")
pub const CHAIN_SIGNATURE: i32 = 0x4652_4545;

/// Next pointer of the last node in a chain
pub const NO_NEXT: i64 = -1;

/// Encoded size of `ChainHeader`
pub const CHAIN_HEADER_LEN: usize = 16;

/// Header at the front of every chain node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHeader {
    pub signature: i32,
    pub next: i64,
    pub count: i32,
}

impl ChainHeader {
    /// Header of an empty, unchained node
    pub fn empty() -> Self {
        Self {
            signature: CHAIN_SIGNATURE,
            next: NO_NEXT,
            count: 0,
        }
    }

    pub fn read_from<P: Page>(page: &P) -> Result<Self> {
        codec::decode(&page.read_vec(0, CHAIN_HEADER_LEN)?)
    }

    pub fn write_to<P: Page>(&self, page: &mut P) -> Result<()> {
        page.write(0, &codec::encode(self)?)
    }

    pub fn is_initialized(&self) -> bool {
        self.signature == CHAIN_SIGNATURE
    }

    /// Address of the next node, if any
    pub fn next(&self) -> Option<u64> {
        u64::try_from(self.next).ok()
    }

    /// Number of live addresses (a negative count reads as empty)
    pub fn count(&self) -> usize {
        usize::try_from(self.count).unwrap_or(0)
    }
}

/// Number of addresses a node of `page_length` bytes can hold
pub fn capacity(page_length: usize) -> usize {
    page_length.saturating_sub(CHAIN_HEADER_LEN) / ADDRESS_SIZE
}

/// Write `addresses` into the body starting at array slot `slot`
pub fn write_addresses<P: Page>(page: &mut P, slot: usize, addresses: &[u64]) -> Result<()> {
    let words = addresses
        .iter()
        .map(|&address| codec::address_word(address))
        .collect::<Result<Vec<_>>>()?;
    page.write(
        CHAIN_HEADER_LEN + slot * ADDRESS_SIZE,
        &codec::encode_words(&words),
    )
}

/// Read `n` addresses from the body starting at array slot `slot`
pub fn read_addresses<P: Page>(page: &P, slot: usize, n: usize) -> Result<Vec<u64>> {
    let bytes = page.read_vec(CHAIN_HEADER_LEN + slot * ADDRESS_SIZE, n * ADDRESS_SIZE)?;
    codec::decode_words(&bytes)?
        .into_iter()
        .map(|word| {
            u64::try_from(word).map_err(|_| {
                HeapError::Corruption(format!("Negative address {} in free chain", word))
            })
        })
        .collect()
}

/// Summary of one node in a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainNode {
    pub address: u64,
    pub count: usize,
    pub next: Option<u64>,
}

/// Follow the chain from `root` to its end without modifying it
pub fn walk<A: Allocator>(allocator: &mut A, root: u64) -> Result<Vec<ChainNode>> {
    let mut nodes = Vec::new();
    let mut visited = HashSet::new();
    let mut cursor = Some(root);

    while let Some(address) = cursor {
        if !visited.insert(address) {
            return Err(HeapError::Corruption(format!(
                "Free chain loops back to {}",
                address
            )));
        }

        let page = allocator.fetch(address)?;
        let header = ChainHeader::read_from(&page)?;
        if !header.is_initialized() {
            return Err(HeapError::Corruption(format!(
                "Page {} is not a free chain node",
                address
            )));
        }

        nodes.push(ChainNode {
            address,
            count: header.count(),
            next: header.next(),
        });
        cursor = header.next();
    }

    Ok(nodes)
}
