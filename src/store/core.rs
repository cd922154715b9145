//! store/core — SchemaStore: структура, create/open, close.

use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::block::block_decode;
use crate::config::StoreConfig;
use crate::consts::{FIRST_RECORD_ID, ID_FILE_SUFFIX, STORE_FILE};
use crate::error::Result;
use crate::ids::{FileIdAllocator, IdAllocator, MemIdAllocator};
use crate::io::{BlockIo, FileBlockIo, MemBlockIo};
use crate::lock::{try_acquire_exclusive_lock, LockGuard};

/// Стор правил схемы.
///
/// Мутации требуют `&mut self`: один хэндл — один писатель. Файловый стор дополнительно
/// держит эксклюзивный lock на каталог.
pub struct SchemaStore {
    pub(crate) io: Box<dyn BlockIo>,
    pub(crate) ids: Box<dyn IdAllocator>,
    pub(crate) cfg: StoreConfig,
    dir: Option<PathBuf>,
    _lock: Option<LockGuard>,
    closed: bool,
}

fn store_path(dir: &Path) -> PathBuf {
    dir.join(STORE_FILE)
}

fn id_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}{}", STORE_FILE, ID_FILE_SUFFIX))
}

impl SchemaStore {
    /// Создать новый файловый стор в каталоге `dir` (каталог создаётся при необходимости).
    pub fn create(dir: &Path, cfg: StoreConfig) -> Result<Self> {
        cfg.validate()?;
        std::fs::create_dir_all(dir)?;
        let lock = try_acquire_exclusive_lock(dir)?;

        let io = FileBlockIo::create(&store_path(dir), cfg.block_size, cfg.data_fsync)?;
        let ids = FileIdAllocator::create(&id_path(dir), cfg.max_id, cfg.data_fsync)?;
        info!("schema store created at {} ({})", dir.display(), cfg);

        Ok(Self {
            io: Box::new(io),
            ids: Box::new(ids),
            cfg,
            dir: Some(dir.to_path_buf()),
            _lock: Some(lock),
            closed: false,
        })
    }

    /// Открыть существующий файловый стор.
    ///
    /// block_size берётся из заголовочного блока. Если id-файл отсутствует, он
    /// восстанавливается сканированием блоков.
    pub fn open(dir: &Path, mut cfg: StoreConfig) -> Result<Self> {
        cfg.validate()?;
        let lock = try_acquire_exclusive_lock(dir)?;

        let io = FileBlockIo::open(&store_path(dir), cfg.data_fsync)?;
        if io.block_size() != cfg.block_size {
            debug!(
                "block_size from store header ({}) overrides config ({})",
                io.block_size(),
                cfg.block_size
            );
            cfg.block_size = io.block_size();
        }

        let ids_file = id_path(dir);
        let mut ids = if ids_file.exists() {
            FileIdAllocator::open(&ids_file, cfg.max_id, cfg.data_fsync)?
        } else {
            warn!(
                "id file {} missing, rebuilding from block scan",
                ids_file.display()
            );
            let mut ids = FileIdAllocator::create(&ids_file, cfg.max_id, cfg.data_fsync)?;
            rebuild_free_ids(&io, &mut ids, cfg.verify_checksums)?;
            ids
        };
        // Блоки за high_id (файл длиннее, чем помнит аллокатор) не должны выдаваться повторно.
        ids.ensure_high_id(io.block_count())?;

        info!(
            "schema store opened at {} (blocks={}, high_id={}, free_ids={})",
            dir.display(),
            io.block_count(),
            ids.high_id(),
            ids.free_count()
        );

        Ok(Self {
            io: Box::new(io),
            ids: Box::new(ids),
            cfg,
            dir: Some(dir.to_path_buf()),
            _lock: Some(lock),
            closed: false,
        })
    }

    /// Эфемерный стор в памяти.
    pub fn in_memory(cfg: StoreConfig) -> Result<Self> {
        cfg.validate()?;
        let io = MemBlockIo::new(cfg.block_size)?;
        let ids = MemIdAllocator::new(cfg.max_id);
        Ok(Self::from_parts(Box::new(io), Box::new(ids), cfg))
    }

    /// Стор поверх внешних коллабораторов. block_size берётся из `io`.
    pub fn with_collaborators(
        io: Box<dyn BlockIo>,
        ids: Box<dyn IdAllocator>,
        mut cfg: StoreConfig,
    ) -> Result<Self> {
        cfg.block_size = io.block_size();
        cfg.validate()?;
        Ok(Self::from_parts(io, ids, cfg))
    }

    fn from_parts(io: Box<dyn BlockIo>, ids: Box<dyn IdAllocator>, cfg: StoreConfig) -> Self {
        Self {
            io,
            ids,
            cfg,
            dir: None,
            _lock: None,
            closed: false,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    /// Каталог файлового стора; None для in-memory.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.io.block_size()
    }

    /// Байт payload на блок.
    #[inline]
    pub fn block_capacity(&self) -> usize {
        self.cfg.block_capacity()
    }

    /// Граница полного сканирования (первый id за последним блоком файла).
    pub fn high_id(&self) -> u64 {
        std::cmp::max(self.io.block_count(), FIRST_RECORD_ID)
    }

    /// Сбросить состояние аллокатора и блоков на диск, не закрывая стор.
    pub fn flush(&mut self) -> Result<()> {
        self.ids.flush()?;
        self.io.sync()
    }

    /// Сбросить всё на диск и освободить lock.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.closed = true;
        match &self.dir {
            Some(dir) => info!("schema store closed at {}", dir.display()),
            None => debug!("in-memory schema store closed"),
        }
        Ok(())
    }
}

impl Drop for SchemaStore {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.ids.flush();
            let _ = self.io.sync();
        }
    }
}

/// Заполнить пустой аллокатор: high_id = число блоков, свободные блоки — в пул.
fn rebuild_free_ids(io: &dyn BlockIo, ids: &mut dyn IdAllocator, verify: bool) -> Result<()> {
    let count = io.block_count();
    ids.ensure_high_id(count)?;
    let mut buf = vec![0u8; io.block_size()];
    let mut freed = 0u64;
    for id in FIRST_RECORD_ID..count {
        io.read_block(id, &mut buf)?;
        match block_decode(id, &buf, verify) {
            Ok(rec) if !rec.in_use => {
                ids.free(id)?;
                freed += 1;
            }
            Ok(_) => {}
            Err(e) => warn!("id rebuild: block {} unreadable, left allocated: {}", id, e),
        }
    }
    info!("id rebuild: high_id={}, free ids={}", count, freed);
    Ok(())
}
