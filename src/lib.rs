// Формат и константы
pub mod consts;
pub mod error;
pub mod config;
pub mod meta;

// Блоки и коллабораторы
pub mod block;  // src/block/{mod,record,header,checksum}.rs
pub mod io;     // src/io/{mod,file,mem}.rs
pub mod ids;    // src/ids/{mod,file,mem}.rs
pub mod lock;

// Правила схемы и цепочки
pub mod rule;   // src/rule/{mod,codec}.rs
pub mod chain;
pub mod store;  // src/store/{mod,core,records,scan,doctor}.rs

// CLI (bin schemastore)
pub mod cli;

// Удобные реэкспорты
pub use block::DynamicRecord;
pub use config::{StoreBuilder, StoreConfig};
pub use consts::BLOCK_SIZE;
pub use error::{Result, StoreError};
pub use ids::IdAllocator;
pub use io::BlockIo;
pub use rule::{IndexRule, Kind, SchemaRule};
pub use store::{CheckReport, LoadAll, SchemaStore};
