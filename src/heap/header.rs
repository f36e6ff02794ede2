//! Heap metadata header
//!
//! ## Layout (big-endian, padded to `metadata_length`)
//! ```text
//! ┌───────────────┬───────────────┬───────────────┬───────────────┬───────────────┬─────────┐
//! │ Signature (8) │ Page len (8)  │ Heap size (8) │ Created (8)   │ Meta len (8)  │ zero .. │
//! └───────────────┴───────────────┴───────────────┴───────────────┴───────────────┴─────────┘
//! ```
//!
//! The metadata length is recorded so a store is never reopened with page 0
//! shifted by a different amount.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::config::MIN_METADATA_LENGTH;
use crate::error::Result;
use crate::medium::Medium;

/// Marks an initialized heap ("PGHEAP" + format 1)
pub const SIGNATURE: u64 = 0x5047_4845_4150_0001;

/// Persisted allocator state stored at address 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapHeader {
    pub signature: u64,
    /// Fixed page length for the life of the store
    pub page_length: u64,
    /// End of the last allocated page
    pub heap_size: u64,
    /// Creation time (unix seconds)
    pub created_at: u64,
    /// Bytes of page 0 reserved for this header
    pub metadata_length: u64,
}

impl HeapHeader {
    /// Header for a freshly initialized store
    pub fn new(page_length: usize, metadata_length: usize) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            signature: SIGNATURE,
            page_length: page_length as u64,
            heap_size: 0,
            created_at,
            metadata_length: metadata_length as u64,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.signature == SIGNATURE
    }

    /// Encode and zero-pad to the metadata region length
    pub fn encode(&self, metadata_length: usize) -> Result<Vec<u8>> {
        let mut bytes = codec::encode(self)?;
        bytes.resize(metadata_length, 0);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }
}

/// Read the header of a medium without opening a heap
///
/// Returns `None` when the signature is absent (uninitialized medium).
pub fn read_header<M: Medium>(medium: &M) -> Result<Option<HeapHeader>> {
    let bytes = medium.read_vec(0, MIN_METADATA_LENGTH)?;
    let header = HeapHeader::decode(&bytes)?;
    Ok(header.is_initialized().then_some(header))
}
