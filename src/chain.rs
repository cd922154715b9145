//! chain — разбиение payload на цепочку блоков.
//!
//! - Первый блок получает id, переданный вызывающим (обычно из next_id()).
//! - Каждый следующий блок — id из аллокатора; предыдущий блок ссылается на него через next.
//! - Блоков ceil(len / capacity), минимум один (пустой payload → один блок length=0).
//! - Цепочка длиннее max_blocks не строится: get_records её бы не прочитал.
//! - Ничего не пишет на диск: вызывающий сохраняет блоки сам, в порядке цепочки.

use log::debug;

use crate::block::DynamicRecord;
use crate::error::{Result, StoreError};
use crate::ids::IdAllocator;

/// Сколько блоков займёт payload длины `len` при ёмкости `capacity`.
#[inline]
pub fn blocks_needed(len: usize, capacity: usize) -> usize {
    if len == 0 {
        1
    } else {
        (len + capacity - 1) / capacity
    }
}

/// Построить цепочку для `payload`, начиная с блока `start_id`.
///
/// Ошибка аллокатора пробрасывается без изменений; id, уже выданные под эту цепочку,
/// при этом возвращаются в пул.
pub fn build_chain(
    start_id: u64,
    payload: &[u8],
    capacity: usize,
    max_blocks: usize,
    ids: &mut dyn IdAllocator,
) -> Result<Vec<DynamicRecord>> {
    if capacity == 0 {
        return Err(StoreError::Config("block capacity must be > 0".into()));
    }

    let count = blocks_needed(payload.len(), capacity);
    if count > max_blocks {
        return Err(StoreError::RuleTooLarge {
            len: payload.len(),
            max: max_blocks.saturating_mul(capacity),
        });
    }
    let mut records: Vec<DynamicRecord> = Vec::with_capacity(count);
    let mut chunks = payload.chunks(capacity);

    records.push(DynamicRecord {
        id: start_id,
        in_use: true,
        start_of_chain: true,
        next: None,
        data: chunks.next().map(|c| c.to_vec()).unwrap_or_default(),
    });

    for chunk in chunks {
        let id = match ids.next_id() {
            Ok(id) => id,
            Err(e) => {
                for r in &records[1..] {
                    let _ = ids.free(r.id);
                }
                return Err(e);
            }
        };
        if let Some(prev) = records.last_mut() {
            prev.next = Some(id);
        }
        records.push(DynamicRecord {
            id,
            in_use: true,
            start_of_chain: false,
            next: None,
            data: chunk.to_vec(),
        });
    }

    debug!(
        "chain: head {} -> {} block(s) for {} byte(s)",
        start_id,
        records.len(),
        payload.len()
    );
    Ok(records)
}
