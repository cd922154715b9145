//! store/records — операции над записями и цепочками.
//!
//! - next_id / allocate_from ничего не пишут в файл блоков.
//! - update_record перезаписывает слот целиком; повторный вызов с тем же содержимым
//!   даёт тот же образ блока.
//! - get_records идёт по next до конца цепочки и проверяет каждую ссылку.

use log::{debug, warn};
use std::collections::HashSet;

use super::core::SchemaStore;
use crate::block::{block_decode, block_encode, concat_data, DynamicRecord};
use crate::chain::build_chain;
use crate::consts::HEADER_BLOCK_ID;
use crate::error::{Result, StoreError};
use crate::rule::{decode_rule, encode_rule, SchemaRule};

impl SchemaStore {
    /// Новый (или переиспользованный) id блока.
    pub fn next_id(&mut self) -> Result<u64> {
        self.ids.next_id()
    }

    /// Разложить rule в цепочку блоков с головой `start_id`. На диск не пишет.
    ///
    /// RuleTooLarge, если цепочка вышла бы длиннее max_chain_blocks.
    pub fn allocate_from(&mut self, start_id: u64, rule: &SchemaRule) -> Result<Vec<DynamicRecord>> {
        let payload = encode_rule(rule)?;
        let capacity = self.block_capacity();
        let max_blocks = self.cfg.max_chain_blocks;
        build_chain(start_id, &payload, capacity, max_blocks, &mut *self.ids)
    }

    /// Записать блок `record.id` целиком (заголовок + данные + нулевой хвост).
    ///
    /// Запись с in_use=false пишется как канонический свободный блок; id в аллокатор
    /// при этом не возвращается (см. free_chain). Используемый блок снимается с пула
    /// свободных id.
    pub fn update_record(&mut self, record: &DynamicRecord) -> Result<()> {
        if record.id == HEADER_BLOCK_ID {
            return Err(StoreError::corruption(
                record.id,
                "block 0 is the store header and cannot hold a record",
            ));
        }
        if record.id > self.cfg.max_id {
            return Err(StoreError::Allocation(format!(
                "block id {} exceeds max_id {}",
                record.id, self.cfg.max_id
            )));
        }
        let mut block = vec![0u8; self.block_size()];
        if record.in_use {
            block_encode(record, &mut block)?;
        } else {
            block_encode(&DynamicRecord::free(record.id), &mut block)?;
        }
        self.io.write_block(record.id, &block)?;
        // id, выбранный вызывающим в обход next_id(), не должен выдаваться повторно
        if record.in_use {
            self.ids.reserve(record.id)?;
        } else {
            self.ids.ensure_high_id(record.id.saturating_add(1))?;
        }
        Ok(())
    }

    /// Прочитать один блок. Блок за концом файла — свободная запись.
    pub fn read_record(&self, id: u64) -> Result<DynamicRecord> {
        if id == HEADER_BLOCK_ID {
            return Err(StoreError::corruption(id, "block 0 is the store header"));
        }
        let mut block = vec![0u8; self.block_size()];
        self.io.read_block(id, &mut block)?;
        block_decode(id, &block, self.cfg.verify_checksums)
    }

    /// Цепочка, начинающаяся с `start_id`, в порядке следования.
    ///
    /// BrokenChain: голова не используется или не является началом цепочки, ссылка
    /// ведёт на свободный блок, на чужую голову, на уже посещённый блок, или цепочка
    /// длиннее max_chain_blocks.
    pub fn get_records(&self, start_id: u64) -> Result<Vec<DynamicRecord>> {
        let head = self.read_record(start_id)?;
        if !head.in_use {
            return Err(StoreError::broken(start_id, start_id, "chain head is not in use"));
        }
        if !head.start_of_chain {
            return Err(StoreError::broken(
                start_id,
                start_id,
                "block is not a start of chain",
            ));
        }
        self.collect_chain(head)
    }

    /// Дочитать цепочку от уже прочитанной головы.
    pub(crate) fn collect_chain(&self, head: DynamicRecord) -> Result<Vec<DynamicRecord>> {
        let head_id = head.id;
        let limit = self.cfg.max_chain_blocks;
        let mut visited: HashSet<u64> = HashSet::new();
        visited.insert(head_id);

        let mut next = head.next;
        let mut chain = vec![head];

        while let Some(id) = next {
            if !visited.insert(id) {
                return Err(StoreError::broken(head_id, id, "cycle: block already visited"));
            }
            if chain.len() >= limit {
                return Err(StoreError::broken(
                    head_id,
                    id,
                    format!("chain exceeds max_chain_blocks ({})", limit),
                ));
            }
            if id == HEADER_BLOCK_ID || id >= self.io.block_count() {
                return Err(StoreError::broken(head_id, id, "link points outside the store"));
            }
            let rec = self.read_record(id)?;
            if !rec.in_use {
                return Err(StoreError::broken(head_id, id, "link points to a free block"));
            }
            if rec.start_of_chain {
                return Err(StoreError::broken(
                    head_id,
                    id,
                    "link points to another chain head",
                ));
            }
            next = rec.next;
            chain.push(rec);
        }

        Ok(chain)
    }

    /// Прочитать и декодировать rule с головой `id`.
    pub fn read_rule(&self, id: u64) -> Result<SchemaRule> {
        let chain = self.get_records(id)?;
        decode_rule(id, &concat_data(&chain))
    }

    /// next_id + allocate_from + update_record для каждого блока. Возвращает id головы.
    ///
    /// id из `rule` игнорируется: rule получает id головы цепочки.
    /// Если запись оборвалась, уже записанные блоки затираются свободными, а все id
    /// цепочки возвращаются в пул.
    pub fn store_rule(&mut self, rule: &SchemaRule) -> Result<u64> {
        let id = self.next_id()?;
        let records = match self.allocate_from(id, rule) {
            Ok(r) => r,
            Err(e) => {
                let _ = self.ids.free(id);
                return Err(e);
            }
        };
        for (written, r) in records.iter().enumerate() {
            if let Err(e) = self.update_record(r) {
                warn!("store_rule: write of block {} failed, rolling back chain {}", r.id, id);
                for done in &records[..written] {
                    let _ = self.update_record(&DynamicRecord::free(done.id));
                }
                for rec in &records {
                    let _ = self.ids.free(rec.id);
                }
                return Err(e);
            }
        }
        debug!("stored {:?} rule at {} ({} block(s))", rule.kind(), id, records.len());
        Ok(id)
    }

    /// Удалить цепочку: все блоки помечаются свободными и их id возвращаются аллокатору.
    /// Возвращает число освобождённых блоков.
    pub fn free_chain(&mut self, start_id: u64) -> Result<usize> {
        let chain = self.get_records(start_id)?;
        for rec in &chain {
            self.update_record(&DynamicRecord::free(rec.id))?;
        }
        for rec in &chain {
            self.ids.free(rec.id)?;
        }
        debug!("freed chain {} ({} block(s))", start_id, chain.len());
        Ok(chain.len())
    }
}
