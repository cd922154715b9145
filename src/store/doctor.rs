//! store/doctor — проверка целостности стора (read-only).
//!
//! - Считает блоки: всего, используемые, свободные, головы цепочек.
//! - Каждая голова проверяется через get_records + decode.
//! - Сироты: используемые блоки-продолжения, до которых не дошла ни одна цепочка.
//!   Целая часть битой цепочки (до первой плохой ссылки) сиротой не считается.

use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;

use super::core::SchemaStore;
use crate::block::{concat_data, DynamicRecord};
use crate::consts::FIRST_RECORD_ID;
use crate::error::Result;
use crate::rule::decode_rule;

#[derive(Debug, Clone, Serialize)]
pub struct ChainIssue {
    pub head: u64,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub block_size: usize,
    pub blocks_scanned: u64,
    pub blocks_in_use: u64,
    pub blocks_free: u64,
    pub chains_ok: u64,
    pub unreadable_blocks: Vec<ChainIssue>,
    pub bad_chains: Vec<ChainIssue>,
    pub orphan_blocks: Vec<u64>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.unreadable_blocks.is_empty() && self.bad_chains.is_empty() && self.orphan_blocks.is_empty()
    }
}

impl SchemaStore {
    pub fn check(&self) -> Result<CheckReport> {
        let end = self.high_id();
        let mut report = CheckReport {
            block_size: self.block_size(),
            ..CheckReport::default()
        };
        let mut continuations: Vec<u64> = Vec::new();
        let mut reached: HashSet<u64> = HashSet::new();

        for id in FIRST_RECORD_ID..end {
            report.blocks_scanned += 1;
            let rec = match self.read_record(id) {
                Ok(r) => r,
                Err(e) => {
                    report.unreadable_blocks.push(ChainIssue {
                        head: id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            if !rec.in_use {
                report.blocks_free += 1;
                continue;
            }
            report.blocks_in_use += 1;
            if !rec.start_of_chain {
                continuations.push(id);
                continue;
            }

            let checked = self.collect_chain(rec).and_then(|chain| {
                reached.extend(chain.iter().map(|r| r.id));
                decode_rule(id, &concat_data(&chain))
            });
            match checked {
                Ok(_) => report.chains_ok += 1,
                Err(e) => {
                    if let Ok(head) = self.read_record(id) {
                        reached.extend(self.reachable_prefix(&head));
                    }
                    report.bad_chains.push(ChainIssue {
                        head: id,
                        error: e.to_string(),
                    });
                }
            }
        }

        report.orphan_blocks = continuations
            .into_iter()
            .filter(|id| !reached.contains(id))
            .collect();

        if report.is_clean() {
            info!(
                "check: {} chain(s) ok, {} block(s) in use, {} free",
                report.chains_ok, report.blocks_in_use, report.blocks_free
            );
        } else {
            warn!(
                "check: {} bad chain(s), {} orphan block(s), {} unreadable block(s)",
                report.bad_chains.len(),
                report.orphan_blocks.len(),
                report.unreadable_blocks.len()
            );
        }
        Ok(report)
    }

    // Продолжения, до которых цепочка доходит до первой битой ссылки.
    fn reachable_prefix(&self, head: &DynamicRecord) -> Vec<u64> {
        let mut out = Vec::new();
        let mut seen: HashSet<u64> = HashSet::new();
        seen.insert(head.id);
        let mut next = head.next;
        while let Some(id) = next {
            if out.len() >= self.cfg.max_chain_blocks || !seen.insert(id) {
                break;
            }
            match self.read_record(id) {
                Ok(rec) if rec.in_use && !rec.start_of_chain => {
                    out.push(id);
                    next = rec.next;
                }
                _ => break,
            }
        }
        out
    }
}
