//! io — блочный ввод/вывод под стором.
//!
//! Стор адресует блоки по id; слой io отвечает только за байты:
//! - read_block: блок за пределами файла читается как нули (никогда не записанный блок);
//! - write_block: перезаписывает слот id целиком, при необходимости растит файл;
//! - block_count: high-water mark файла (граница полного сканирования).
//!
//! Реализации:
//! - file.rs — один файл `schemastore.db`, блок 0 — заголовок стора.
//! - mem.rs  — in-memory вектор блоков (эфемерный стор, тесты).

pub mod file;
pub mod mem;

pub use file::FileBlockIo;
pub use mem::MemBlockIo;

use crate::error::Result;

pub trait BlockIo {
    fn block_size(&self) -> usize;
    fn read_block(&self, id: u64, buf: &mut [u8]) -> Result<()>;
    fn write_block(&mut self, id: u64, buf: &[u8]) -> Result<()>;
    /// Число блоков (включая заголовочный блок 0).
    fn block_count(&self) -> u64;
    fn sync(&mut self) -> Result<()>;
}

/// Проверка размера буфера, общая для всех реализаций.
pub(crate) fn check_buf(block_size: usize, id: u64, len: usize) -> Result<()> {
    if len != block_size {
        return Err(crate::error::StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("block {}: buffer size {} != block_size {}", id, len, block_size),
        )));
    }
    Ok(())
}
