//! Ошибки стора.
//!
//! Ни одна из ошибок не ретраится внутри ядра: операция прерывается в точке обнаружения,
//! соседние цепочки не затрагиваются.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Заголовок блока или payload нарушают структурные инварианты.
    #[error("format corruption at block {block}: {reason}")]
    FormatCorruption { block: u64, reason: String },

    /// Ссылка цепочки ведёт на отсутствующий, свободный или уже посещённый блок.
    #[error("broken chain (head {head}) at block {block}: {reason}")]
    BrokenChain {
        head: u64,
        block: u64,
        reason: String,
    },

    /// Пространство id исчерпано или аллокатор не смог выдать id.
    #[error("id allocation failed: {0}")]
    Allocation(String),

    #[error("rule too large: {len} bytes (max {max})")]
    RuleTooLarge { len: usize, max: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("store is locked by another process: {}", .0.display())]
    Locked(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn corruption(block: u64, reason: impl Into<String>) -> Self {
        StoreError::FormatCorruption {
            block,
            reason: reason.into(),
        }
    }

    pub(crate) fn broken(head: u64, block: u64, reason: impl Into<String>) -> Self {
        StoreError::BrokenChain {
            head,
            block,
            reason: reason.into(),
        }
    }

    /// true для ошибок, которые описывают повреждение одной цепочки (а не всего стора).
    pub fn is_chain_local(&self) -> bool {
        matches!(
            self,
            StoreError::FormatCorruption { .. } | StoreError::BrokenChain { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
