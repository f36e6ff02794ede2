//! Configuration for pageheap
//!
//! Centralized configuration with sensible defaults.

use crate::error::{HeapError, Result};

/// Smallest metadata region able to hold the encoded heap header
pub const MIN_METADATA_LENGTH: usize = 40;

/// Main configuration for a page heap
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Page Geometry
    // -------------------------------------------------------------------------
    /// Size of each dirty-tracking unit (in bytes)
    pub block_length: usize,

    /// Number of blocks per page
    /// Page length = block_length * page_span
    pub page_span: usize,

    /// Reserved header region at address 0 (in bytes)
    /// Must fit inside the first block of page 0
    pub metadata_length: usize,

    // -------------------------------------------------------------------------
    // Recycling Configuration
    // -------------------------------------------------------------------------
    /// Max freed addresses held in memory before flushing to the free chain
    pub cache_limit: usize,

    // -------------------------------------------------------------------------
    // Medium Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often the file medium calls fsync
    pub sync_strategy: SyncStrategy,
}

/// File medium sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// sync_data after every write (safest, slowest)
    EveryWrite,

    /// sync only when the medium is closed
    OnClose,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_length: 4096,
            page_span: 1,
            metadata_length: 256,
            cache_limit: 64,
            sync_strategy: SyncStrategy::OnClose,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Total page length in bytes (saturates; `validate()` rejects overflow)
    pub fn page_length(&self) -> usize {
        self.block_length.saturating_mul(self.page_span)
    }

    /// Check that the geometry is usable
    pub fn validate(&self) -> Result<()> {
        if self.page_span == 0 {
            return Err(HeapError::Config(format!(
                "Invalid page span {}",
                self.page_span
            )));
        }
        if self.metadata_length < MIN_METADATA_LENGTH {
            return Err(HeapError::Config(format!(
                "Metadata length must be at least {} (supplied {})",
                MIN_METADATA_LENGTH, self.metadata_length
            )));
        }
        if self.block_length < self.metadata_length {
            return Err(HeapError::Config(format!(
                "Block length {} is smaller than metadata length {}",
                self.block_length, self.metadata_length
            )));
        }
        if self.block_length.checked_mul(self.page_span).is_none() {
            return Err(HeapError::Config(format!(
                "Page of {} blocks of {} bytes overflows",
                self.page_span, self.block_length
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the block length (in bytes)
    pub fn block_length(mut self, length: usize) -> Self {
        self.config.block_length = length;
        self
    }

    /// Set the number of blocks per page
    pub fn page_span(mut self, span: usize) -> Self {
        self.config.page_span = span;
        self
    }

    /// Set the reserved metadata length (in bytes)
    pub fn metadata_length(mut self, length: usize) -> Self {
        self.config.metadata_length = length;
        self
    }

    /// Set the recycling cache limit
    pub fn cache_limit(mut self, limit: usize) -> Self {
        self.config.cache_limit = limit;
        self
    }

    /// Set the file medium sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
