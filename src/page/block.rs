//! Block-array page
//!
//! Page split into equal-length blocks with a dirty flag per block.

use crate::error::{HeapError, Result};

use super::{check_range, Flush, Page};

/// Page made of equal-length blocks, each flushed independently
pub struct BlockPage<F> {
    /// Address of the first block
    address: u64,
    /// Length shared by every block
    block_length: usize,
    /// Owned block buffers
    blocks: Vec<Vec<u8>>,
    /// One flag per block
    dirty: Vec<bool>,
    /// Writes a dirty block back to the medium
    flush: F,
}

impl<F: Flush> BlockPage<F> {
    /// Wrap already-loaded blocks (all clean)
    pub fn new(address: u64, blocks: Vec<Vec<u8>>, flush: F) -> Result<Self> {
        let block_length = match blocks.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => {
                return Err(HeapError::Config(
                    "A page needs at least one non-empty block".to_string(),
                ))
            }
        };
        if let Some(bad) = blocks.iter().find(|b| b.len() != block_length) {
            return Err(HeapError::Config(format!(
                "Block length mismatch: expected {}, found {}",
                block_length,
                bad.len()
            )));
        }

        let dirty = vec![false; blocks.len()];
        Ok(Self {
            address,
            block_length,
            blocks,
            dirty,
            flush,
        })
    }

    /// Fresh all-zero page of `span` blocks
    pub fn zeroed(address: u64, block_length: usize, span: usize, flush: F) -> Result<Self> {
        Self::new(address, vec![vec![0u8; block_length]; span], flush)
    }

    pub fn block_length(&self) -> usize {
        self.block_length
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether block `index` has unflushed writes
    pub fn is_dirty(&self, index: usize) -> bool {
        self.dirty.get(index).copied().unwrap_or(false)
    }
}

impl<F: Flush> Page for BlockPage<F> {
    fn address(&self) -> u64 {
        self.address
    }

    fn length(&self) -> usize {
        self.block_length * self.blocks.len()
    }

    fn write(&mut self, at: usize, data: &[u8]) -> Result<()> {
        check_range(at, data.len(), self.length())?;

        let mut done = 0;
        while done < data.len() {
            let pos = at + done;
            let index = pos / self.block_length;
            let start = pos % self.block_length;
            let limit = (data.len() - done).min(self.block_length - start);

            self.blocks[index][start..start + limit].copy_from_slice(&data[done..done + limit]);
            self.dirty[index] = true;
            done += limit;
        }
        Ok(())
    }

    fn read(&self, at: usize, buf: &mut [u8]) -> Result<()> {
        check_range(at, buf.len(), self.length())?;

        let mut done = 0;
        while done < buf.len() {
            let pos = at + done;
            let index = pos / self.block_length;
            let start = pos % self.block_length;
            let limit = (buf.len() - done).min(self.block_length - start);

            buf[done..done + limit].copy_from_slice(&self.blocks[index][start..start + limit]);
            done += limit;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        for index in 0..self.blocks.len() {
            if !self.dirty[index] {
                continue;
            }
            let address = self.address + (index * self.block_length) as u64;
            self.flush.flush(address, &self.blocks[index])?;
            self.dirty[index] = false;
        }
        Ok(())
    }
}
