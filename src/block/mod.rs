//! block — on-disk представление динамической записи (один блок фиксированного размера).
//!
//! Разделение по подмодулям:
//! - record.rs   — DynamicRecord (in-memory вид блока).
//! - header.rs   — кодирование/декодирование блока: заголовок 16 байт + payload.
//! - checksum.rs — CRC32C по блоку (поле crc считается занулённым).

pub mod checksum;
pub mod header;
pub mod record;

pub use checksum::{block_checksum, block_update_checksum, block_verify_checksum};
pub use header::{block_decode, block_encode, block_is_blank};
pub use record::{concat_data, DynamicRecord};
