//! Single-page address log
//!
//! A bounded set of reusable addresses kept in one page as an append-only
//! journal. The live set is the replay of the journal.
//!
//! ## Page Layout (big-endian)
//! ```text
//! ┌───────────────┬───────────┬──────────────────────────────┐
//! │ Signature (4) │ Count (4) │ Entry (8, signed) × count .. │
//! └───────────────┴───────────┴──────────────────────────────┘
//! ```
//! A positive entry inserts its value, a negative entry removes its
//! negation. Zero is never stored.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::codec::{self, ADDRESS_SIZE};
use crate::error::{HeapError, Result};
use crate::page::Page;

/// Marks an initialized log page ("ALOG")
pub const LOG_SIGNATURE: i32 = 0x414C_4F47;

/// Encoded size of `LogHeader`
pub const LOG_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct LogHeader {
    signature: i32,
    count: i32,
}

/// Sorted address set persisted as a single-page journal
///
/// `pop()` hands out the lowest address first, which keeps the live
/// address range compact.
pub struct LogPageSet<P: Page> {
    /// Page holding the journal
    page: P,
    /// Replayed live set
    set: BTreeSet<u64>,
    /// Entries written to the journal so far
    count: usize,
}

impl<P: Page> LogPageSet<P> {
    /// Replay the journal in `page`, initializing it if unsigned
    pub fn open(mut page: P) -> Result<Self> {
        if page.length() < LOG_HEADER_LEN + ADDRESS_SIZE {
            return Err(HeapError::Config(format!(
                "Page of {} bytes cannot hold an address log",
                page.length()
            )));
        }
        let capacity = Self::capacity_of(&page);

        let header: LogHeader = codec::decode(&page.read_vec(0, LOG_HEADER_LEN)?)?;
        if header.signature != LOG_SIGNATURE {
            let header = LogHeader {
                signature: LOG_SIGNATURE,
                count: 0,
            };
            page.write(0, &codec::encode(&header)?)?;
            page.commit()?;
            tracing::debug!("Initialized address log in page {}", page.address());

            return Ok(Self {
                page,
                set: BTreeSet::new(),
                count: 0,
            });
        }

        let count = usize::try_from(header.count)
            .ok()
            .filter(|&count| count <= capacity)
            .ok_or_else(|| {
                HeapError::Corruption(format!(
                    "Log count {} outside capacity {}",
                    header.count, capacity
                ))
            })?;

        let entries = codec::decode_words(&page.read_vec(LOG_HEADER_LEN, count * ADDRESS_SIZE)?)?;
        let mut set = BTreeSet::new();
        for (index, entry) in entries.into_iter().enumerate() {
            match entry {
                0 => {
                    return Err(HeapError::Corruption(format!(
                        "Zero entry at position {} of address log {}",
                        index,
                        page.address()
                    )))
                }
                e if e > 0 => {
                    set.insert(e as u64);
                }
                e => {
                    set.remove(&e.unsigned_abs());
                }
            }
        }

        tracing::debug!(
            "Replayed {} log entries into {} addresses",
            count,
            set.len()
        );

        Ok(Self { page, set, count })
    }

    /// Add `address` to the set
    ///
    /// Rejects zero, the page's own address and duplicates; nothing is
    /// written when a push is rejected.
    pub fn push(&mut self, address: u64) -> Result<()> {
        if self.is_full() {
            return Err(HeapError::CapacityExceeded(format!(
                "Address log holds at most {} addresses",
                self.capacity()
            )));
        }
        if address == 0 {
            return Err(HeapError::InvalidAddress(
                "Address 0 cannot be stored".to_string(),
            ));
        }
        if address == self.page.address() {
            return Err(HeapError::InvalidAddress(format!(
                "Address {} is reserved by the log page itself",
                address
            )));
        }
        if self.set.contains(&address) {
            return Err(HeapError::InvalidAddress(format!(
                "Duplicated address {}",
                address
            )));
        }
        let entry = codec::address_word(address)?;

        self.apply(entry)
    }

    /// Remove and return the lowest address, or `None` if empty
    pub fn pop(&mut self) -> Result<Option<u64>> {
        let Some(&address) = self.set.first() else {
            return Ok(None);
        };
        // Every member was validated to fit a signed word on push or replay
        self.apply(-(address as i64))?;
        Ok(Some(address))
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Whether the live set reached the page's capacity
    pub fn is_full(&self) -> bool {
        self.set.len() >= self.capacity()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Maximum number of entries the page body holds
    pub fn capacity(&self) -> usize {
        Self::capacity_of(&self.page)
    }

    pub fn contains(&self, address: u64) -> bool {
        self.set.contains(&address)
    }

    /// Live addresses in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.set.iter().copied()
    }

    /// Entries currently in the journal
    pub fn log_len(&self) -> usize {
        self.count
    }

    pub fn address(&self) -> u64 {
        self.page.address()
    }

    /// Commit the page and hand it back
    pub fn close(mut self) -> Result<P> {
        self.page.commit()?;
        Ok(self.page)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn capacity_of(page: &P) -> usize {
        (page.length() - LOG_HEADER_LEN) / ADDRESS_SIZE
    }

    /// Apply one entry to the set and the journal
    ///
    /// When the journal cannot be committed the set change is undone and the
    /// page buffer is rewound to match the set again.
    fn apply(&mut self, entry: i64) -> Result<()> {
        let address = entry.unsigned_abs();
        let inserted = entry > 0;
        if inserted {
            self.set.insert(address);
        } else {
            self.set.remove(&address);
        }

        let Err(err) = self.log(entry) else {
            return Ok(());
        };

        if inserted {
            self.set.remove(&address);
        } else {
            self.set.insert(address);
        }
        if let Err(rewind) = self.rewind() {
            tracing::warn!(
                "Failed to rewind address log {}: {}",
                self.page.address(),
                rewind
            );
        }
        Err(err)
    }

    /// Append one entry; a full journal is first compacted to the live set
    ///
    /// Called after `set` already reflects the change, so compaction alone
    /// records it. `count` only advances once the page is committed.
    fn log(&mut self, entry: i64) -> Result<()> {
        let count = if self.count < self.capacity() {
            self.page.write(
                LOG_HEADER_LEN + self.count * ADDRESS_SIZE,
                &entry.to_be_bytes(),
            )?;
            self.count + 1
        } else {
            let written = self.write_compacted()?;
            tracing::debug!(
                "Compacted address log {} from {} to {} entries",
                self.page.address(),
                self.count,
                written
            );
            written
        };

        self.write_header(count)?;
        self.page.commit()?;
        self.count = count;
        Ok(())
    }

    /// Bring the page buffer back in line with `set` and `count`
    fn rewind(&mut self) -> Result<()> {
        // A failed compaction may have overwritten the journal body
        if self.count >= self.capacity() {
            self.count = self.write_compacted()?;
        }
        self.write_header(self.count)
    }

    /// Write the live set as the journal body, returning its entry count
    fn write_compacted(&mut self) -> Result<usize> {
        let words = self.set.iter().map(|&a| a as i64).collect::<Vec<_>>();
        self.page.write(LOG_HEADER_LEN, &codec::encode_words(&words))?;
        Ok(words.len())
    }

    fn write_header(&mut self, count: usize) -> Result<()> {
        let header = LogHeader {
            signature: LOG_SIGNATURE,
            count: count as i32,
        };
        self.page.write(0, &codec::encode(&header)?)
    }
}
