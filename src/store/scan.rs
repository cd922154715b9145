//! store/scan — полное сканирование стора (восстановление всех правил без индекса).
//!
//! Блоки перебираются по возрастанию id, начиная с FIRST_RECORD_ID. Каждая голова
//! (in_use && start_of_chain) даёт ровно один элемент; блоки-продолжения пропускаются.
//!
//! Политика ошибок: битая цепочка даёт один Err-элемент, сканирование продолжается
//! со следующего id. Прервать на первой ошибке — `collect::<Result<Vec<_>>>()`,
//! пропустить битые — load_all_lenient().
//!
//! Нечитаемый блок даёт Err, только если по сырым флагам это голова цепочки.
//! Нечитаемые свободные блоки и продолжения пропускаются с warn!: продолжение
//! репортит его собственная цепочка.

use log::{debug, warn};

use super::core::SchemaStore;
use crate::block::concat_data;
use crate::consts::{FIRST_RECORD_ID, FLAG_IN_USE, FLAG_START_OF_CHAIN, OFF_FLAGS};
use crate::error::Result;
use crate::rule::{decode_rule, SchemaRule};

/// Ленивый итератор по всем правилам стора. Не перезапускается: для нового прохода
/// нужен новый load_all().
pub struct LoadAll<'a> {
    store: &'a SchemaStore,
    next: u64,
    end: u64,
}

impl<'a> Iterator for LoadAll<'a> {
    type Item = Result<SchemaRule>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.end {
            let id = self.next;
            self.next += 1;

            let head = match self.store.read_record(id) {
                Ok(r) => r,
                Err(e) if self.store.raw_is_chain_head(id) => return Some(Err(e)),
                Err(e) => {
                    warn!("load_all: skip unreadable non-head block {}: {}", id, e);
                    continue;
                }
            };
            if !head.is_chain_head() {
                continue;
            }
            let item = self
                .store
                .collect_chain(head)
                .and_then(|chain| decode_rule(id, &concat_data(&chain)));
            return Some(item);
        }
        None
    }
}

impl SchemaStore {
    // Флаги блока как есть, без проверки crc и структуры заголовка.
    fn raw_is_chain_head(&self, id: u64) -> bool {
        let mut block = vec![0u8; self.block_size()];
        if self.io.read_block(id, &mut block).is_err() {
            return false;
        }
        let head = FLAG_IN_USE | FLAG_START_OF_CHAIN;
        block[OFF_FLAGS] & head == head
    }

    /// Все правила стора, по возрастанию id головы.
    pub fn load_all(&self) -> LoadAll<'_> {
        let end = self.high_id();
        debug!("load_all: scanning blocks {}..{}", FIRST_RECORD_ID, end);
        LoadAll {
            store: self,
            next: FIRST_RECORD_ID,
            end,
        }
    }

    /// Как load_all, но битые цепочки логируются и пропускаются.
    pub fn load_all_lenient(&self) -> Vec<SchemaRule> {
        let mut out = Vec::new();
        let mut skipped = 0usize;
        for item in self.load_all() {
            match item {
                Ok(rule) => out.push(rule),
                Err(e) => {
                    skipped += 1;
                    warn!("load_all: skip bad chain: {}", e);
                }
            }
        }
        if skipped > 0 {
            warn!("load_all: {} chain(s) skipped, {} loaded", skipped, out.len());
        }
        out
    }
}
