//! Общие константы формата (файл блоков, заголовок блока, id-файл).

// -------- Store file --------
pub const STORE_FILE: &str = "schemastore.db";
pub const STORE_MAGIC: &[u8; 8] = b"SCHSTOR1";
pub const STORE_VERSION: u32 = 1;
/// Блок 0 занят заголовком стора и никогда не выдаётся как id записи.
pub const HEADER_BLOCK_ID: u64 = 0;
/// Первый id, который может получить запись.
pub const FIRST_RECORD_ID: u64 = 1;

// -------- Blocks --------
/// Размер блока по умолчанию (заголовок + payload).
pub const BLOCK_SIZE: usize = 64;
/// [flags u8][reserved u8][length u16][next u64][crc32c u32]
pub const BLOCK_HEADER_SIZE: usize = 16;
/// Минимально допустимая ёмкость блока.
pub const MIN_BLOCK_CAPACITY: usize = 8;
/// length хранится в u16.
pub const MAX_BLOCK_CAPACITY: usize = u16::MAX as usize;

pub const OFF_FLAGS: usize = 0;
pub const OFF_RESERVED: usize = 1;
pub const OFF_LENGTH: usize = 2;
pub const OFF_NEXT: usize = 4;
pub const OFF_CRC: usize = 12;

pub const FLAG_IN_USE: u8 = 0x01;
pub const FLAG_START_OF_CHAIN: u8 = 0x02;
pub const FLAGS_KNOWN: u8 = FLAG_IN_USE | FLAG_START_OF_CHAIN;

/// Sentinel для отсутствующего next.
pub const NO_BLOCK: u64 = u64::MAX;

// -------- Id allocator file --------
// Формат (LE):
// [magic8="SCHIDS01"][ver u32=1][reserved u32][high_id u64]
// Далее последовательность u64 id (free-лист, LIFO).
pub const ID_FILE_SUFFIX: &str = ".id";
pub const ID_MAGIC: &[u8; 8] = b"SCHIDS01";
pub const ID_VERSION: u32 = 1;
pub const ID_HDR_SIZE: u64 = 24;

// -------- Lock --------
pub const LOCK_FILE: &str = "schemastore.lock";
