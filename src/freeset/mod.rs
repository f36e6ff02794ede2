//! Free-Address Set Module
//!
//! Two persisted forms of a set of reclaimed page addresses.
//!
//! - `chain`: unbounded linked list of pages holding raw address arrays;
//!   driven by `RecyclingHeap`
//! - `log`: one page holding an append-only insert/remove journal whose
//!   replay is a sorted set; bounded by the page size

pub mod chain;
mod log;

pub use chain::{ChainHeader, ChainNode};
pub use log::{LogPageSet, LOG_HEADER_LEN, LOG_SIGNATURE};
