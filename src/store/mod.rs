//! store — SchemaStore: динамический стор записей поверх блочного io и аллокатора id.
//!
//! Подмодули:
//! - core.rs    — структура, create/open/in_memory, close.
//! - records.rs — next_id, allocate_from, update_record, get_records, read/store/free rule.
//! - scan.rs    — load_all (ленивое полное сканирование) и lenient-вариант.
//! - doctor.rs  — check(): сводка по блокам, сироты, битые цепочки.

pub mod core;
pub mod doctor;
pub mod records;
pub mod scan;

pub use self::core::SchemaStore;
pub use doctor::{ChainIssue, CheckReport};
pub use scan::LoadAll;
