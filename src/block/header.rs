//! block/header — сериализация DynamicRecord в блок фиксированного размера.
//!
//! Layout (LE):
//! [flags u8][reserved u8][length u16][next u64][crc32c u32][payload: block_size-16]
//!
//! - flags: bit0 = in_use, bit1 = start_of_chain; остальные биты обязаны быть 0.
//! - next == NO_BLOCK (u64::MAX) — конец цепочки.
//! - payload дополняется нулями до конца блока.
//! - Блок с полностью нулевым заголовком — ни разу не записанный свободный блок.

use byteorder::{ByteOrder, LittleEndian};

use crate::block::checksum::{block_update_checksum, block_verify_checksum};
use crate::block::record::DynamicRecord;
use crate::consts::{
    BLOCK_HEADER_SIZE, FLAGS_KNOWN, FLAG_IN_USE, FLAG_START_OF_CHAIN, NO_BLOCK, OFF_FLAGS,
    OFF_LENGTH, OFF_NEXT, OFF_RESERVED,
};
use crate::error::{Result, StoreError};

/// Заголовок блока никогда не записывался.
pub fn block_is_blank(block: &[u8]) -> bool {
    block.len() >= BLOCK_HEADER_SIZE && block[..BLOCK_HEADER_SIZE].iter().all(|&b| b == 0)
}

/// Записать запись в буфер блока целиком (заголовок, payload, нулевой хвост, crc).
pub fn block_encode(rec: &DynamicRecord, block: &mut [u8]) -> Result<()> {
    if block.len() <= BLOCK_HEADER_SIZE {
        return Err(StoreError::corruption(rec.id, "block buffer too small for header"));
    }
    let capacity = block.len() - BLOCK_HEADER_SIZE;
    if rec.data.len() > capacity {
        return Err(StoreError::corruption(
            rec.id,
            format!("record length {} exceeds block capacity {}", rec.data.len(), capacity),
        ));
    }
    if rec.next == Some(NO_BLOCK) {
        return Err(StoreError::corruption(rec.id, "next id collides with NO_BLOCK sentinel"));
    }

    let mut flags = 0u8;
    if rec.in_use {
        flags |= FLAG_IN_USE;
    }
    if rec.start_of_chain {
        flags |= FLAG_START_OF_CHAIN;
    }

    block[OFF_FLAGS] = flags;
    block[OFF_RESERVED] = 0;
    LittleEndian::write_u16(&mut block[OFF_LENGTH..OFF_LENGTH + 2], rec.data.len() as u16);
    LittleEndian::write_u64(&mut block[OFF_NEXT..OFF_NEXT + 8], rec.next.unwrap_or(NO_BLOCK));

    let payload_end = BLOCK_HEADER_SIZE + rec.data.len();
    block[BLOCK_HEADER_SIZE..payload_end].copy_from_slice(&rec.data);
    for b in &mut block[payload_end..] {
        *b = 0;
    }

    block_update_checksum(block);
    Ok(())
}

/// Прочитать запись из буфера блока.
///
/// Ошибки FormatCorruption: неизвестные биты flags, start_of_chain без in_use,
/// ненулевой reserved, length > capacity, несовпадение crc (если verify_crc).
pub fn block_decode(id: u64, block: &[u8], verify_crc: bool) -> Result<DynamicRecord> {
    if block.len() <= BLOCK_HEADER_SIZE {
        return Err(StoreError::corruption(id, "block buffer too small for header"));
    }
    if block_is_blank(block) {
        return Ok(DynamicRecord::free(id));
    }
    if verify_crc && !block_verify_checksum(block) {
        return Err(StoreError::corruption(id, "block checksum mismatch"));
    }

    let flags = block[OFF_FLAGS];
    if flags & !FLAGS_KNOWN != 0 {
        return Err(StoreError::corruption(id, format!("unknown block flags 0x{:02x}", flags)));
    }
    if block[OFF_RESERVED] != 0 {
        return Err(StoreError::corruption(id, "reserved header byte is not zero"));
    }
    let in_use = flags & FLAG_IN_USE != 0;
    let start_of_chain = flags & FLAG_START_OF_CHAIN != 0;
    if start_of_chain && !in_use {
        return Err(StoreError::corruption(id, "start-of-chain flag on a free block"));
    }

    let capacity = block.len() - BLOCK_HEADER_SIZE;
    let length = LittleEndian::read_u16(&block[OFF_LENGTH..OFF_LENGTH + 2]) as usize;
    if length > capacity {
        return Err(StoreError::corruption(
            id,
            format!("length {} exceeds block capacity {}", length, capacity),
        ));
    }
    let next_raw = LittleEndian::read_u64(&block[OFF_NEXT..OFF_NEXT + 8]);
    let next = if next_raw == NO_BLOCK { None } else { Some(next_raw) };
    if !in_use && (length != 0 || next.is_some()) {
        return Err(StoreError::corruption(id, "free block carries payload or link"));
    }

    Ok(DynamicRecord {
        id,
        in_use,
        start_of_chain,
        next,
        data: block[BLOCK_HEADER_SIZE..BLOCK_HEADER_SIZE + length].to_vec(),
    })
}
