//! ids/file — персистентный аллокатор id (файл `<store>.id`).
//!
//! Формат (LE):
//! - Header (24 B):
//!   [magic8="SCHIDS01"][ver u32=1][reserved u32=0][high_id u64]
//! - Tail:
//!   последовательность u64 id (LE), по одному на свободный блок.
//!
//! Политика:
//! - Источник истины для числа свободных id — длина файла: (len - HDR) / 8.
//! - next_id/free пишут файл сразу (write-through); fsync — только при data_fsync.
//! - В памяти держим копию хвоста, чтобы не читать файл на каждый вызов.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::IdAllocator;
use crate::consts::{FIRST_RECORD_ID, ID_HDR_SIZE, ID_MAGIC, ID_VERSION};
use crate::error::{Result, StoreError};

const OFF_HIGH_ID: u64 = 16;

pub struct FileIdAllocator {
    path: PathBuf,
    file: File,
    high: u64,
    free: Vec<u64>,
    max_id: u64,
    data_fsync: bool,
}

impl FileIdAllocator {
    /// Создать новый id-файл. Ошибка, если уже существует.
    pub fn create(path: &Path, max_id: u64, data_fsync: bool) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(path)?;

        file.write_all(ID_MAGIC)?;
        file.write_u32::<LittleEndian>(ID_VERSION)?;
        file.write_u32::<LittleEndian>(0)?; // reserved
        file.write_u64::<LittleEndian>(FIRST_RECORD_ID)?;
        file.sync_all()?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            high: FIRST_RECORD_ID,
            free: Vec::new(),
            max_id,
            data_fsync,
        })
    }

    /// Открыть существующий id-файл и проверить заголовок.
    pub fn open(path: &Path, max_id: u64, data_fsync: bool) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let len = file.metadata()?.len();
        if len < ID_HDR_SIZE || (len - ID_HDR_SIZE) % 8 != 0 {
            return Err(StoreError::corruption(
                0,
                format!("id file {} has bad length {}", path.display(), len),
            ));
        }

        let mut magic = [0u8; 8];
        file.read_exact(&mut magic)?;
        if &magic != ID_MAGIC {
            return Err(StoreError::corruption(
                0,
                format!("bad id file magic in {}", path.display()),
            ));
        }
        let ver = file.read_u32::<LittleEndian>()?;
        if ver != ID_VERSION {
            return Err(StoreError::corruption(
                0,
                format!("unsupported id file version {} in {}", ver, path.display()),
            ));
        }
        let _reserved = file.read_u32::<LittleEndian>()?;
        let high = file.read_u64::<LittleEndian>()?.max(FIRST_RECORD_ID);

        let count = (len - ID_HDR_SIZE) / 8;
        let mut free = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = file.read_u64::<LittleEndian>()?;
            if id >= FIRST_RECORD_ID && id < high {
                free.push(id);
            }
        }
        debug!(
            "ids: opened {} (high_id={}, free={})",
            path.display(),
            high,
            free.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            high,
            free,
            max_id,
            data_fsync,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_high(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(OFF_HIGH_ID))?;
        self.file.write_u64::<LittleEndian>(self.high)?;
        self.maybe_sync()
    }

    // Хвост переписывается целиком из копии в памяти.
    fn rewrite_tail(&mut self) -> Result<()> {
        self.file.set_len(ID_HDR_SIZE)?;
        self.file.seek(SeekFrom::Start(ID_HDR_SIZE))?;
        for &id in &self.free {
            self.file.write_u64::<LittleEndian>(id)?;
        }
        self.maybe_sync()
    }

    fn maybe_sync(&self) -> Result<()> {
        if self.data_fsync {
            self.file.sync_all()?;
        }
        Ok(())
    }
}

impl IdAllocator for FileIdAllocator {
    fn next_id(&mut self) -> Result<u64> {
        if let Some(id) = self.free.pop() {
            let new_len = ID_HDR_SIZE + (self.free.len() as u64) * 8;
            self.file.set_len(new_len)?;
            self.maybe_sync()?;
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
        self.write_high()?;
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
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_u64::<LittleEndian>(id)?;
        self.maybe_sync()?;
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
            debug!("ids: raise high_id {} -> {}", self.high, min_high);
            self.high = min_high;
            self.write_high()?;
        }
        Ok(())
    }

    fn reserve(&mut self, id: u64) -> Result<()> {
        if let Some(pos) = self.free.iter().position(|&f| f == id) {
            self.free.remove(pos);
            self.rewrite_tail()?;
            debug!("ids: reserve freed id {}", id);
        }
        self.ensure_high_id(id.saturating_add(1))
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}
