//! Centralized configuration and builder for the schema store.
//!
//! - StoreConfig::from_env() reads SCHEMA_* environment variables.
//! - Fluent `with_*` setters and StoreBuilder override single fields.
//! - validate() is called by SchemaStore::create/open/in_memory.
//!
//! When an existing store is opened, the block size recorded in its header block
//! wins over `block_size` from the config.

use std::fmt;

use crate::consts::{BLOCK_HEADER_SIZE, BLOCK_SIZE, MAX_BLOCK_CAPACITY, MIN_BLOCK_CAPACITY};
use crate::error::{Result, StoreError};

/// Top-level configuration of a SchemaStore.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Full block size in bytes (header + payload).
    /// Env: SCHEMA_BLOCK_SIZE (default BLOCK_SIZE = 64)
    pub block_size: usize,

    /// fsync the block file and the id file after every write.
    /// Env: SCHEMA_DATA_FSYNC (default false; "1|true|on|yes" => true)
    pub data_fsync: bool,

    /// Verify CRC32C of every block on read.
    /// Env: SCHEMA_VERIFY_CHECKSUM (default true)
    pub verify_checksums: bool,

    /// Upper bound on blocks in one chain; a longer chain is reported as broken.
    /// Env: SCHEMA_MAX_CHAIN_BLOCKS (default 1_000_000)
    pub max_chain_blocks: usize,

    /// Highest id the allocator may hand out.
    /// Env: SCHEMA_MAX_ID (default u64::MAX - 1)
    pub max_id: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            data_fsync: false,
            verify_checksums: true,
            max_chain_blocks: 1_000_000,
            max_id: u64::MAX - 1,
        }
    }
}

fn env_flag(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "on" || s == "yes"
}

impl StoreConfig {
    /// Load configuration from environment variables on top of defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SCHEMA_BLOCK_SIZE") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.block_size = n;
            }
        }

        if let Ok(v) = std::env::var("SCHEMA_DATA_FSYNC") {
            cfg.data_fsync = env_flag(&v);
        }

        if let Ok(v) = std::env::var("SCHEMA_VERIFY_CHECKSUM") {
            cfg.verify_checksums = env_flag(&v);
        }

        if let Ok(v) = std::env::var("SCHEMA_MAX_CHAIN_BLOCKS") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.max_chain_blocks = n;
            }
        }

        if let Ok(v) = std::env::var("SCHEMA_MAX_ID") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.max_id = n;
            }
        }

        cfg
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_data_fsync(mut self, on: bool) -> Self {
        self.data_fsync = on;
        self
    }

    pub fn with_verify_checksums(mut self, on: bool) -> Self {
        self.verify_checksums = on;
        self
    }

    pub fn with_max_chain_blocks(mut self, n: usize) -> Self {
        self.max_chain_blocks = n;
        self
    }

    pub fn with_max_id(mut self, id: u64) -> Self {
        self.max_id = id;
        self
    }

    /// Payload bytes per block for the configured block size.
    pub fn block_capacity(&self) -> usize {
        self.block_size.saturating_sub(BLOCK_HEADER_SIZE)
    }

    pub fn validate(&self) -> Result<()> {
        validate_block_size(self.block_size)?;
        if self.max_chain_blocks == 0 {
            return Err(StoreError::Config("max_chain_blocks must be > 0".into()));
        }
        if self.max_id == 0 || self.max_id == u64::MAX {
            return Err(StoreError::Config(format!(
                "max_id must be in [1 .. {}], got {}",
                u64::MAX - 1,
                self.max_id
            )));
        }
        Ok(())
    }
}

/// Block size must leave [MIN_BLOCK_CAPACITY .. MAX_BLOCK_CAPACITY] payload bytes.
pub fn validate_block_size(block_size: usize) -> Result<()> {
    let min = BLOCK_HEADER_SIZE + MIN_BLOCK_CAPACITY;
    let max = BLOCK_HEADER_SIZE + MAX_BLOCK_CAPACITY;
    if block_size < min || block_size > max {
        return Err(StoreError::Config(format!(
            "block_size must be in [{} .. {}], got {}",
            min, max, block_size
        )));
    }
    Ok(())
}

impl fmt::Display for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreConfig {{ \
             block_size: {}, \
             data_fsync: {}, \
             verify_checksums: {}, \
             max_chain_blocks: {}, \
             max_id: {} \
             }}",
            self.block_size,
            self.data_fsync,
            self.verify_checksums,
            self.max_chain_blocks,
            self.max_id,
        )
    }
}

/// Lightweight builder that produces a StoreConfig.
#[derive(Clone, Debug)]
pub struct StoreBuilder {
    cfg: StoreConfig,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: StoreConfig::from_env(),
        }
    }
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: StoreConfig::default(),
        }
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.cfg.block_size = block_size;
        self
    }

    pub fn data_fsync(mut self, on: bool) -> Self {
        self.cfg.data_fsync = on;
        self
    }

    pub fn verify_checksums(mut self, on: bool) -> Self {
        self.cfg.verify_checksums = on;
        self
    }

    pub fn max_chain_blocks(mut self, n: usize) -> Self {
        self.cfg.max_chain_blocks = n;
        self
    }

    pub fn max_id(mut self, id: u64) -> Self {
        self.cfg.max_id = id;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.cfg
    }
}
