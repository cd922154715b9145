//! block/checksum — CRC32C (Castagnoli) по всему блоку.
//!
//! Поле crc (4 байта по OFF_CRC) при расчёте считается нулевым, поэтому
//! update/verify не требуют копии блока.

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{BLOCK_HEADER_SIZE, OFF_CRC};

/// CRC32C блока с занулённым полем crc.
pub fn block_checksum(block: &[u8]) -> u32 {
    let crc = crc32c::crc32c(&block[..OFF_CRC]);
    let crc = crc32c::crc32c_append(crc, &[0u8; 4]);
    crc32c::crc32c_append(crc, &block[BLOCK_HEADER_SIZE..])
}

/// Записать crc в заголовок блока.
pub fn block_update_checksum(block: &mut [u8]) {
    let crc = block_checksum(block);
    LittleEndian::write_u32(&mut block[OFF_CRC..OFF_CRC + 4], crc);
}

/// true = crc в заголовке совпадает с пересчитанным.
pub fn block_verify_checksum(block: &[u8]) -> bool {
    let stored = LittleEndian::read_u32(&block[OFF_CRC..OFF_CRC + 4]);
    stored == block_checksum(block)
}
