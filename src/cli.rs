use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::rule::{IndexRule, SchemaRule};
use crate::store::SchemaStore;

#[derive(Parser, Debug)]
#[command(
    name = "schemastore",
    version,
    about = "Block-chained schema rule store",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Create a new empty store
    Init {
        #[arg(long)]
        path: PathBuf,
        /// Full block size (header + payload); default from SCHEMA_BLOCK_SIZE or 64
        #[arg(long)]
        block_size: Option<usize>,
    },
    /// Block/id summary
    Status {
        #[arg(long)]
        path: PathBuf,
    },
    /// Store an index rule (label id, property key); prints the rule id
    AddIndex {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        label: i32,
        #[arg(long)]
        key: String,
    },
    /// Read one rule by id
    Get {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        id: u64,
    },
    /// List all rules (full scan). --json prints a JSON array.
    List {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Delete a rule and free its blocks
    Drop {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        id: u64,
    },
    /// Integrity check (bad chains, orphan blocks). Exit code 2 if not clean.
    Check {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show one raw block: header fields and payload hex
    DumpBlock {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        id: u64,
    },
}

fn open_store(path: &Path) -> Result<SchemaStore> {
    SchemaStore::open(path, StoreConfig::from_env())
        .with_context(|| format!("open schema store at {}", path.display()))
}

fn print_rule(rule: &SchemaRule) {
    match rule {
        SchemaRule::Index(r) => println!(
            "id={} kind=index_rule label={} key='{}'",
            r.id, r.label_id, r.property_key
        ),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Init { path, block_size } => {
            let mut cfg = StoreConfig::from_env();
            if let Some(bs) = block_size {
                cfg = cfg.with_block_size(bs);
            }
            let store = SchemaStore::create(&path, cfg)
                .with_context(|| format!("create schema store at {}", path.display()))?;
            println!(
                "Initialized schema store at {} (block_size={}, capacity={})",
                path.display(),
                store.block_size(),
                store.block_capacity()
            );
            store.close()?;
        }
        Cmd::Status { path } => {
            let store = open_store(&path)?;
            let report = store.check()?;
            println!("Schema store at {}", path.display());
            println!("  block_size     = {} bytes", store.block_size());
            println!("  block_capacity = {} bytes", store.block_capacity());
            println!("  high_id        = {}", store.high_id());
            println!("  blocks_in_use  = {}", report.blocks_in_use);
            println!("  blocks_free    = {}", report.blocks_free);
            println!("  rules          = {}", report.chains_ok);
            store.close()?;
        }
        Cmd::AddIndex { path, label, key } => {
            let mut store = open_store(&path)?;
            let rule = SchemaRule::Index(IndexRule::new(0, label, key));
            let id = store.store_rule(&rule).context("store index rule")?;
            println!("{}", id);
            store.close()?;
        }
        Cmd::Get { path, id } => {
            let store = open_store(&path)?;
            let rule = store
                .read_rule(id)
                .with_context(|| format!("read rule {}", id))?;
            print_rule(&rule);
            store.close()?;
        }
        Cmd::List { path, json } => {
            let store = open_store(&path)?;
            let rules = store
                .load_all()
                .collect::<crate::error::Result<Vec<_>>>()
                .context("load all rules")?;
            if json {
                println!("{}", serde_json::to_string(&rules)?);
            } else if rules.is_empty() {
                println!("(no rules)");
            } else {
                for r in &rules {
                    print_rule(r);
                }
            }
            store.close()?;
        }
        Cmd::Drop { path, id } => {
            let mut store = open_store(&path)?;
            let n = store
                .free_chain(id)
                .with_context(|| format!("drop rule {}", id))?;
            println!("Dropped rule {} ({} block(s) freed)", id, n);
            store.close()?;
        }
        Cmd::Check { path, json } => {
            let store = open_store(&path)?;
            let report = store.check()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("chains ok      = {}", report.chains_ok);
                println!("blocks in use  = {}", report.blocks_in_use);
                println!("blocks free    = {}", report.blocks_free);
                for issue in &report.bad_chains {
                    println!("BAD CHAIN {}: {}", issue.head, issue.error);
                }
                for issue in &report.unreadable_blocks {
                    println!("UNREADABLE {}: {}", issue.head, issue.error);
                }
                for id in &report.orphan_blocks {
                    println!("ORPHAN {}", id);
                }
            }
            let clean = report.is_clean();
            store.close()?;
            if !clean {
                std::process::exit(2);
            }
        }
        Cmd::DumpBlock { path, id } => {
            let store = open_store(&path)?;
            let rec = store
                .read_record(id)
                .with_context(|| format!("read block {}", id))?;
            println!("block {}", rec.id);
            println!("  in_use         = {}", rec.in_use);
            println!("  start_of_chain = {}", rec.start_of_chain);
            println!("  length         = {}", rec.length());
            match rec.next {
                Some(n) => println!("  next           = {}", n),
                None => println!("  next           = (none)"),
            }
            println!("  data           = {}", to_hex(&rec.data));
            store.close()?;
        }
    }
    Ok(())
}
