//! Offset page decorator
//!
//! Hides the first `skip` bytes of an inner page. The heap uses it for
//! page 0, whose leading bytes hold the heap header.

use crate::error::{HeapError, Result};

use super::{check_range, Page};

/// Page view shifted past a hidden prefix of `skip` bytes
pub struct OffsetPage<P> {
    inner: P,
    skip: usize,
}

impl<P: Page> OffsetPage<P> {
    pub fn new(inner: P, skip: usize) -> Result<Self> {
        if skip > inner.length() {
            return Err(HeapError::Config(format!(
                "Cannot hide {} bytes of a {} byte page",
                skip,
                inner.length()
            )));
        }
        Ok(Self { inner, skip })
    }

    /// View with nothing hidden
    pub fn transparent(inner: P) -> Self {
        Self { inner, skip: 0 }
    }

    /// Number of hidden leading bytes
    pub fn skip(&self) -> usize {
        self.skip
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Page> Page for OffsetPage<P> {
    fn address(&self) -> u64 {
        self.inner.address()
    }

    fn length(&self) -> usize {
        self.inner.length() - self.skip
    }

    fn write(&mut self, at: usize, data: &[u8]) -> Result<()> {
        check_range(at, data.len(), self.length())?;
        self.inner.write(at + self.skip, data)
    }

    fn read(&self, at: usize, buf: &mut [u8]) -> Result<()> {
        check_range(at, buf.len(), self.length())?;
        self.inner.read(at + self.skip, buf)
    }

    fn commit(&mut self) -> Result<()> {
        self.inner.commit()
    }
}
