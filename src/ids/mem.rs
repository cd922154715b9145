//! ids/mem — in-memory аллокатор.

use log::debug;

use super::IdAllocator;
use crate::consts::FIRST_RECORD_ID;
use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
pub struct MemIdAllocator {
    high: u64,
    free: Vec<u64>,
    max_id: u64,
}

impl MemIdAllocator {
    pub fn new(max_id: u64) -> Self {
        Self {
            high: FIRST_RECORD_ID,
            free: Vec::new(),
            max_id,
        }
    }
}

impl IdAllocator for MemIdAllocator {
    fn next_id(&mut self) -> Result<u64> {
        if let Some(id) = self.free.pop() {
            debug!("ids: reuse freed id {}", id);
            return Ok(id);
        }
        if self.high > self.max_id {
            return Err(StoreError::Allocation(format!(
                "id space exhausted (max_id={})",
                self.max_id
            )));
        }
        let id = self.high;
        self.high += 1;
        Ok(id)
    }

    fn free(&mut self, id: u64) -> Result<()> {
        if id < FIRST_RECORD_ID || id >= self.high {
            debug!("ids: ignore free of unallocated id {}", id);
            return Ok(());
        }
        if self.free.contains(&id) {
            debug!("ids: id {} already free", id);
            return Ok(());
        }
        self.free.push(id);
        Ok(())
    }

    fn high_id(&self) -> u64 {
        self.high
    }

    fn free_count(&self) -> u64 {
        self.free.len() as u64
    }

    fn ensure_high_id(&mut self, min_high: u64) -> Result<()> {
        if min_high > self.high {
            self.high = min_high;
        }
        Ok(())
    }

    fn reserve(&mut self, id: u64) -> Result<()> {
        if let Some(pos) = self.free.iter().position(|&f| f == id) {
            self.free.remove(pos);
            debug!("ids: reserve freed id {}", id);
        }
        self.ensure_high_id(id.saturating_add(1))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_after_header_block_and_reuse_lifo() {
        let mut a = MemIdAllocator::new(u64::MAX - 1);
        assert_eq!(a.next_id().unwrap(), 1);
        assert_eq!(a.next_id().unwrap(), 2);
        assert_eq!(a.next_id().unwrap(), 3);
        a.free(1).unwrap();
        a.free(3).unwrap();
        a.free(3).unwrap(); // повторный free игнорируется
        a.free(0).unwrap(); // header block
        a.free(99).unwrap(); // не выдавался
        assert_eq!(a.free_count(), 2);
        assert_eq!(a.next_id().unwrap(), 3);
        assert_eq!(a.next_id().unwrap(), 1);
        assert_eq!(a.next_id().unwrap(), 4);
        assert_eq!(a.high_id(), 5);
    }

    #[test]
    fn reserve_takes_id_out_of_pool() {
        let mut a = MemIdAllocator::new(u64::MAX - 1);
        for _ in 0..3 {
            a.next_id().unwrap();
        }
        a.free(2).unwrap();
        a.free(3).unwrap();
        a.reserve(3).unwrap();
        assert_eq!(a.free_count(), 1);
        assert_eq!(a.next_id().unwrap(), 2);
        assert_eq!(a.next_id().unwrap(), 4);

        // id выше high_id
        a.reserve(10).unwrap();
        assert_eq!(a.high_id(), 11);
        assert_eq!(a.next_id().unwrap(), 11);
    }

    #[test]
    fn exhaustion_is_allocation_error() {
        let mut a = MemIdAllocator::new(2);
        a.next_id().unwrap();
        a.next_id().unwrap();
        assert!(matches!(a.next_id(), Err(StoreError::Allocation(_))));
    }
}
