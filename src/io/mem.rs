//! io/mem — блоки в памяти.
//!
//! Разреженное хранилище: держим только записанные блоки, так что запись по большому
//! id не раздувает память.

use std::collections::BTreeMap;

use super::{check_buf, BlockIo};
use crate::consts::HEADER_BLOCK_ID;
use crate::error::Result;
use crate::meta::{store_header_encode, StoreHeader};

pub struct MemBlockIo {
    block_size: usize,
    blocks: BTreeMap<u64, Vec<u8>>,
}

impl MemBlockIo {
    /// Новый in-memory «файл» с заголовочным блоком 0.
    pub fn new(block_size: usize) -> Result<Self> {
        let mut header = vec![0u8; block_size];
        store_header_encode(&StoreHeader::new(block_size as u32), &mut header)?;
        let mut blocks = BTreeMap::new();
        blocks.insert(HEADER_BLOCK_ID, header);
        Ok(Self { block_size, blocks })
    }
}

impl BlockIo for MemBlockIo {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn read_block(&self, id: u64, buf: &mut [u8]) -> Result<()> {
        check_buf(self.block_size, id, buf.len())?;
        match self.blocks.get(&id) {
            Some(b) => buf.copy_from_slice(b),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_block(&mut self, id: u64, buf: &[u8]) -> Result<()> {
        check_buf(self.block_size, id, buf.len())?;
        self.blocks.insert(id, buf.to_vec());
        Ok(())
    }

    fn block_count(&self) -> u64 {
        self.blocks
            .keys()
            .next_back()
            .map_or(0, |&id| id.saturating_add(1))
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}
