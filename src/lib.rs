//! # pageheap
//!
//! A page-oriented storage foundation with:
//! - Fixed-size pages with per-block dirty tracking
//! - A bump allocator that persists its boundary in a header at address 0
//! - Recycling of freed pages through a persisted free chain
//! - A single-page journaled set of reusable addresses
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RecyclingHeap                             │
//! │        (LIFO cache → free chain → fresh page)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      BumpHeap                                │
//! │        (header @ 0, boundary under one mutex)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Page     │          │   Medium    │
//!   │ (blocks +   │─flush──▶ │ (file /     │
//!   │  dirty bits)│          │  memory)    │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod codec;

pub mod medium;
pub mod page;
pub mod heap;
pub mod freeset;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HeapError, Result};
pub use config::{Config, SyncStrategy};
pub use heap::{Allocator, BumpHeap, RecyclingHeap, Session};
pub use medium::{FileMedium, MemoryMedium, Medium};
pub use page::{BlockPage, OffsetPage, Page};
pub use freeset::LogPageSet;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of pageheap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
