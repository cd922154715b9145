//! rule/codec — payload правила схемы (big-endian).
//!
//! Общий префикс всех видов:
//! [label_id i32][kind u8]
//!
//! INDEX_RULE (kind=1):
//! [label_id i32][kind u8][key_len u16][property_key utf-8, key_len байт]
//!
//! Ни паддинга, ни checksum: целостность блоков — забота block-слоя.

use byteorder::{BigEndian, ByteOrder};

use super::{IndexRule, Kind, SchemaRule};
use crate::error::{Result, StoreError};

const OFF_LABEL: usize = 0;
const OFF_KIND: usize = 4;
const OFF_KEY_LEN: usize = 5;

/// Фиксированная часть index rule: label(4) + kind(1) + key_len(2).
pub const INDEX_RULE_HEADER_LEN: usize = 7;

/// Сериализовать rule в payload.
pub fn encode_rule(rule: &SchemaRule) -> Result<Vec<u8>> {
    match rule {
        SchemaRule::Index(r) => encode_index_rule(r),
    }
}

fn encode_index_rule(r: &IndexRule) -> Result<Vec<u8>> {
    let key = r.property_key.as_bytes();
    if key.len() > u16::MAX as usize {
        return Err(StoreError::RuleTooLarge {
            len: key.len(),
            max: u16::MAX as usize,
        });
    }
    let mut out = vec![0u8; INDEX_RULE_HEADER_LEN + key.len()];
    BigEndian::write_i32(&mut out[OFF_LABEL..OFF_LABEL + 4], r.label_id);
    out[OFF_KIND] = Kind::IndexRule.id();
    BigEndian::write_u16(&mut out[OFF_KEY_LEN..OFF_KEY_LEN + 2], key.len() as u16);
    out[INDEX_RULE_HEADER_LEN..].copy_from_slice(key);
    Ok(out)
}

/// Разобрать payload цепочки с головой `id`.
///
/// FormatCorruption: короткий буфер, неизвестный kind, длина ключа за пределами
/// буфера, невалидный UTF-8, лишние байты после ключа.
pub fn decode_rule(id: u64, bytes: &[u8]) -> Result<SchemaRule> {
    if bytes.len() < OFF_KIND + 1 {
        return Err(StoreError::corruption(
            id,
            format!("rule payload too short ({} bytes)", bytes.len()),
        ));
    }
    let label_id = BigEndian::read_i32(&bytes[OFF_LABEL..OFF_LABEL + 4]);
    let kind_id = bytes[OFF_KIND];
    match Kind::from_id(kind_id) {
        Some(Kind::IndexRule) => decode_index_rule(id, label_id, &bytes[OFF_KIND + 1..]),
        None => Err(StoreError::corruption(id, format!("unknown rule kind {}", kind_id))),
    }
}

fn decode_index_rule(id: u64, label_id: i32, rest: &[u8]) -> Result<SchemaRule> {
    if rest.len() < 2 {
        return Err(StoreError::corruption(id, "index rule: missing property key length"));
    }
    let key_len = BigEndian::read_u16(&rest[..2]) as usize;
    let tail = &rest[2..];
    if key_len > tail.len() {
        return Err(StoreError::corruption(
            id,
            format!(
                "index rule: property key length {} exceeds remaining {} bytes",
                key_len,
                tail.len()
            ),
        ));
    }
    if key_len < tail.len() {
        return Err(StoreError::corruption(
            id,
            format!("index rule: {} trailing bytes", tail.len() - key_len),
        ));
    }
    let property_key = std::str::from_utf8(tail)
        .map_err(|e| StoreError::corruption(id, format!("index rule: property key utf-8: {}", e)))?
        .to_string();

    Ok(SchemaRule::Index(IndexRule {
        id,
        label_id,
        property_key,
    }))
}
