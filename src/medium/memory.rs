//! In-memory medium
//!
//! Growable buffer for tests and throwaway heaps.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use crate::error::{HeapError, Result};

use super::Medium;

/// Initial capacity of a fresh buffer
const INITIAL_CAPACITY: usize = 64;

/// Growable in-memory medium
///
/// Clones share the same buffer, so a test can keep one handle for
/// inspection while the heap owns the other.
#[derive(Clone)]
pub struct MemoryMedium {
    inner: Arc<Mutex<MemoryInner>>,
}

struct MemoryInner {
    /// Written image; `len()` is the high-water mark of all writes
    buf: BytesMut,
    closed: bool,
}

impl MemoryMedium {
    /// Create an empty medium
    pub fn new() -> Self {
        Self::with_buffer(BytesMut::with_capacity(INITIAL_CAPACITY))
    }

    /// Create a medium pre-loaded with an existing image
    pub fn from_bytes(image: &[u8]) -> Self {
        Self::with_buffer(BytesMut::from(image))
    }

    fn with_buffer(buf: BytesMut) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner { buf, closed: false })),
        }
    }

    /// Copy of everything written so far (available after close)
    pub fn snapshot(&self) -> Bytes {
        Bytes::copy_from_slice(&self.inner.lock().buf)
    }

    /// Current size of the written image
    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl Default for MemoryMedium {
    fn default() -> Self {
        Self::new()
    }
}

fn span(at: u64, len: usize) -> Result<(usize, usize)> {
    let start = usize::try_from(at)
        .map_err(|_| HeapError::OutOfRange(format!("Offset {} exceeds memory medium", at)))?;
    let end = start
        .checked_add(len)
        .ok_or_else(|| HeapError::OutOfRange(format!("Range at {} of {} overflows", at, len)))?;
    Ok((start, end))
}

impl Medium for MemoryMedium {
    fn read(&self, at: u64, buf: &mut [u8]) -> Result<()> {
        let inner = self.inner.lock();
        if inner.closed {
            return Err(HeapError::Closed);
        }
        let (start, end) = span(at, buf.len())?;

        buf.fill(0);
        let written = inner.buf.len();
        if start < written {
            let available = end.min(written) - start;
            buf[..available].copy_from_slice(&inner.buf[start..start + available]);
        }
        Ok(())
    }

    fn write(&self, at: u64, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(HeapError::Closed);
        }
        let (start, end) = span(at, data.len())?;

        if end > inner.buf.len() {
            inner.buf.resize(end, 0);
        }
        inner.buf[start..end].copy_from_slice(data);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.inner.lock().closed = true;
        Ok(())
    }
}
