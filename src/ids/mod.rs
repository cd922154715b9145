//! ids — аллокатор id блоков.
//!
//! Контракт:
//! - next_id() выдаёт сначала освобождённые id (LIFO), затем — свежие с high-water mark.
//! - free(id) возвращает id в пул; id вне [FIRST_RECORD_ID .. high_id) игнорируется.
//! - high_id() — первый ни разу не выданный id (граница сканирования сверху).
//! - reserve(id) — id больше не выдаётся, даже если лежал в пуле.
//!
//! Реализации:
//! - file.rs — персистентный `<store>.id` (header + хвост свободных id).
//! - mem.rs  — эфемерный аллокатор для in-memory стора и тестов.

pub mod file;
pub mod mem;

pub use file::FileIdAllocator;
pub use mem::MemIdAllocator;

use crate::error::Result;

pub trait IdAllocator {
    fn next_id(&mut self) -> Result<u64>;
    fn free(&mut self, id: u64) -> Result<()>;
    fn high_id(&self) -> u64;
    /// Число свободных id в пуле.
    fn free_count(&self) -> u64;
    /// Поднять high_id не ниже `min_high` (после открытия файла блоков большей длины).
    fn ensure_high_id(&mut self, min_high: u64) -> Result<()>;
    /// Убрать `id` из пула свободных и поднять high_id выше него: блок занят записью,
    /// сделанной в обход next_id().
    fn reserve(&mut self, id: u64) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}
