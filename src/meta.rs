// src/meta.rs — заголовочный блок стора (блок 0)
//
// Формат (LE), начало блока 0:
// MAGIC8 = "SCHSTOR1"
// u32 version     = 1
// u32 block_size  (BLOCK_HEADER_SIZE + 8 ..= BLOCK_HEADER_SIZE + 65535)
// u32 crc32c      (по предыдущим 16 байтам)
// Остаток блока — нули.
//
// Блок 0 никогда не выдаётся как id записи, поэтому полное сканирование начинается с 1.

use byteorder::{ByteOrder, LittleEndian};

use crate::config::validate_block_size;
use crate::consts::{HEADER_BLOCK_ID, STORE_MAGIC, STORE_VERSION};
use crate::error::{Result, StoreError};

/// Значимая часть заголовочного блока.
pub const STORE_HEADER_LEN: usize = 20;

const OFF_MAGIC: usize = 0;
const OFF_VERSION: usize = 8;
const OFF_BLOCK_SIZE: usize = 12;
const OFF_HDR_CRC: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHeader {
    pub version: u32,
    pub block_size: u32,
}

impl StoreHeader {
    pub fn new(block_size: u32) -> Self {
        Self {
            version: STORE_VERSION,
            block_size,
        }
    }
}

/// Записать заголовок в буфер блока 0 (остаток зануляется).
pub fn store_header_encode(h: &StoreHeader, block: &mut [u8]) -> Result<()> {
    validate_block_size(h.block_size as usize)?;
    if block.len() < STORE_HEADER_LEN {
        return Err(StoreError::corruption(
            HEADER_BLOCK_ID,
            "buffer too small for store header",
        ));
    }
    block.fill(0);
    block[OFF_MAGIC..OFF_MAGIC + 8].copy_from_slice(STORE_MAGIC);
    LittleEndian::write_u32(&mut block[OFF_VERSION..OFF_VERSION + 4], h.version);
    LittleEndian::write_u32(&mut block[OFF_BLOCK_SIZE..OFF_BLOCK_SIZE + 4], h.block_size);
    let crc = crc32c::crc32c(&block[..OFF_HDR_CRC]);
    LittleEndian::write_u32(&mut block[OFF_HDR_CRC..OFF_HDR_CRC + 4], crc);
    Ok(())
}

/// Прочитать заголовок (валидация magic/версии/crc/block_size).
pub fn store_header_decode(block: &[u8]) -> Result<StoreHeader> {
    if block.len() < STORE_HEADER_LEN {
        return Err(StoreError::corruption(HEADER_BLOCK_ID, "store header truncated"));
    }
    if &block[OFF_MAGIC..OFF_MAGIC + 8] != STORE_MAGIC {
        return Err(StoreError::corruption(HEADER_BLOCK_ID, "bad store magic"));
    }
    let stored = LittleEndian::read_u32(&block[OFF_HDR_CRC..OFF_HDR_CRC + 4]);
    if stored != crc32c::crc32c(&block[..OFF_HDR_CRC]) {
        return Err(StoreError::corruption(HEADER_BLOCK_ID, "store header checksum mismatch"));
    }
    let version = LittleEndian::read_u32(&block[OFF_VERSION..OFF_VERSION + 4]);
    if version != STORE_VERSION {
        return Err(StoreError::corruption(
            HEADER_BLOCK_ID,
            format!("unsupported store version {} (expected {})", version, STORE_VERSION),
        ));
    }
    let block_size = LittleEndian::read_u32(&block[OFF_BLOCK_SIZE..OFF_BLOCK_SIZE + 4]);
    validate_block_size(block_size as usize)
        .map_err(|e| StoreError::corruption(HEADER_BLOCK_ID, e.to_string()))?;

    Ok(StoreHeader {
        version,
        block_size,
    })
}
