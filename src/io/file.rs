//! io/file — файл блоков фиксированного размера.
//!
//! - Блок id лежит по смещению id * block_size.
//! - Блок 0 — заголовок стора (см. meta.rs); при open() из него берётся block_size.
//! - Хвост файла короче блока (оборванная запись) дочитывается нулями.
//! - fsync после записи — только при data_fsync.

use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{check_buf, BlockIo};
use crate::error::{Result, StoreError};
use crate::meta::{store_header_decode, store_header_encode, StoreHeader, STORE_HEADER_LEN};

pub struct FileBlockIo {
    path: PathBuf,
    file: File,
    block_size: usize,
    len: u64,
    data_fsync: bool,
}

impl FileBlockIo {
    /// Создать новый файл блоков и записать заголовочный блок. Ошибка, если файл существует.
    pub fn create(path: &Path, block_size: usize, data_fsync: bool) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(path)?;

        let mut header = vec![0u8; block_size];
        store_header_encode(&StoreHeader::new(block_size as u32), &mut header)?;
        file.write_all(&header)?;
        file.sync_all()?;
        info!(
            "created block file {} (block_size={})",
            path.display(),
            block_size
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            block_size,
            len: block_size as u64,
            data_fsync,
        })
    }

    /// Открыть существующий файл блоков; block_size читается из заголовка.
    pub fn open(path: &Path, data_fsync: bool) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();

        let mut raw = [0u8; STORE_HEADER_LEN];
        if len < STORE_HEADER_LEN as u64 {
            return Err(StoreError::corruption(
                0,
                format!("store file {} too small ({} bytes)", path.display(), len),
            ));
        }
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut raw)?;
        let header = store_header_decode(&raw)?;
        let block_size = header.block_size as usize;
        debug!(
            "opened block file {} (block_size={}, len={})",
            path.display(),
            block_size,
            len
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            block_size,
            len,
            data_fsync,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    fn offset(&self, id: u64) -> Result<u64> {
        id.checked_mul(self.block_size as u64).ok_or_else(|| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("block {} offset overflows u64", id),
            ))
        })
    }
}

impl BlockIo for FileBlockIo {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn read_block(&self, id: u64, buf: &mut [u8]) -> Result<()> {
        check_buf(self.block_size, id, buf.len())?;
        let off = self.offset(id)?;
        if off >= self.len {
            buf.fill(0);
            return Ok(());
        }
        let avail = std::cmp::min(self.len - off, self.block_size as u64) as usize;
        let mut f = &self.file;
        f.seek(SeekFrom::Start(off))?;
        f.read_exact(&mut buf[..avail])?;
        buf[avail..].fill(0);
        Ok(())
    }

    fn write_block(&mut self, id: u64, buf: &[u8]) -> Result<()> {
        check_buf(self.block_size, id, buf.len())?;
        let off = self.offset(id)?;
        self.file.seek(SeekFrom::Start(off))?;
        self.file.write_all(buf)?;
        if self.data_fsync {
            self.file.sync_data()?;
        }
        let end = off + self.block_size as u64;
        if end > self.len {
            self.len = end;
        }
        Ok(())
    }

    fn block_count(&self) -> u64 {
        let bs = self.block_size as u64;
        (self.len + bs - 1) / bs
    }

    fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}
