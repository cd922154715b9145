use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use schemastore::consts::{ID_FILE_SUFFIX, STORE_FILE};
use schemastore::{IndexRule, SchemaRule, SchemaStore, StoreBuilder, StoreConfig, StoreError};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("schemastore-file-{prefix}-{pid}-{t}-{id}"))
}

fn rule(label: i32, key: &str) -> SchemaRule {
    SchemaRule::Index(IndexRule::new(0, label, key))
}

fn long_key(tag: &str, n: usize) -> String {
    let mut s = String::from(tag);
    for i in 0..n {
        s.push_str(if i % 2 == 0 { "ding" } else { "dong" });
    }
    s
}

#[test]
fn rules_survive_close_and_reopen() -> Result<()> {
    let root = unique_root("reopen");
    let mut expected = Vec::new();
    {
        let mut store = SchemaStore::create(&root, StoreConfig::default())?;
        for (label, key) in [(0, "name".to_string()), (1, long_key("age", 40)), (2, "x".to_string())] {
            let r = rule(label, &key);
            let id = store.store_rule(&r)?;
            expected.push(r.with_id(id));
        }
        store.close()?;
    }

    let store = SchemaStore::open(&root, StoreConfig::default())?;
    let loaded: Vec<SchemaRule> = store.load_all().collect::<schemastore::Result<_>>()?;
    assert_eq!(loaded, expected);
    store.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn ids_continue_after_reopen() -> Result<()> {
    let root = unique_root("ids");
    let first_id;
    {
        let mut store = SchemaStore::create(&root, StoreConfig::default())?;
        first_id = store.store_rule(&rule(0, &long_key("k", 30)))?;
        store.close()?;
    }
    let mut store = SchemaStore::open(&root, StoreConfig::default())?;
    let used: Vec<u64> = store.get_records(first_id)?.iter().map(|r| r.id).collect();
    let next = store.next_id()?;
    assert!(!used.contains(&next), "id {next} is already used by chain {used:?}");
    assert_eq!(next, used.iter().max().unwrap() + 1);
    store.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn block_size_comes_from_store_header() -> Result<()> {
    let root = unique_root("bs");
    let cfg = StoreBuilder::from_default().block_size(128).build();
    {
        let mut store = SchemaStore::create(&root, cfg)?;
        assert_eq!(store.block_capacity(), 112);
        store.store_rule(&rule(9, &long_key("wide", 60)))?;
        store.close()?;
    }
    // Конфиг говорит 64, заголовок — 128
    let store = SchemaStore::open(&root, StoreConfig::default())?;
    assert_eq!(store.block_size(), 128);
    assert_eq!(store.config().block_size, 128);
    assert_eq!(store.load_all().count(), 1);
    store.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn missing_id_file_is_rebuilt_from_blocks() -> Result<()> {
    let root = unique_root("rebuild");
    let freed: Vec<u64>;
    let kept_id;
    {
        let mut store = SchemaStore::create(&root, StoreConfig::default())?;
        let drop_id = store.store_rule(&rule(1, &long_key("drop", 20)))?;
        kept_id = store.store_rule(&rule(2, "keep"))?;
        freed = store.get_records(drop_id)?.iter().map(|r| r.id).collect();
        store.free_chain(drop_id)?;
        store.close()?;
    }
    fs::remove_file(root.join(format!("{}{}", STORE_FILE, ID_FILE_SUFFIX)))?;

    let mut store = SchemaStore::open(&root, StoreConfig::default())?;
    let reused = store.next_id()?;
    assert!(freed.contains(&reused), "expected one of {freed:?}, got {reused}");
    assert_ne!(reused, kept_id);

    let loaded: Vec<SchemaRule> = store.load_all().collect::<schemastore::Result<_>>()?;
    assert_eq!(loaded, vec![rule(2, "keep").with_id(kept_id)]);
    store.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn second_writer_is_locked_out() -> Result<()> {
    let root = unique_root("lock");
    let store = SchemaStore::create(&root, StoreConfig::default())?;
    match SchemaStore::open(&root, StoreConfig::default()) {
        Err(StoreError::Locked(_)) => {}
        Err(e) => panic!("expected Locked, got {e:?}"),
        Ok(_) => panic!("second open must fail while the store is locked"),
    }
    store.close()?;

    // После close lock свободен
    let again = SchemaStore::open(&root, StoreConfig::default())?;
    again.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn create_over_existing_store_fails() -> Result<()> {
    let root = unique_root("exists");
    SchemaStore::create(&root, StoreConfig::default())?.close()?;
    assert!(SchemaStore::create(&root, StoreConfig::default()).is_err());
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn update_record_rewrites_identical_bytes() -> Result<()> {
    let root = unique_root("idem");
    let mut store = SchemaStore::create(&root, StoreConfig::default())?;
    let id = store.next_id()?;
    let records = store.allocate_from(id, &rule(3, &long_key("same", 25)))?;
    for r in &records {
        store.update_record(r)?;
    }
    store.flush()?;
    let before = fs::read(root.join(STORE_FILE))?;

    for r in &records {
        store.update_record(r)?;
    }
    store.flush()?;
    let after = fs::read(root.join(STORE_FILE))?;
    assert_eq!(before, after);

    store.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn invalid_block_size_rejected() {
    let root = unique_root("badcfg");
    let cfg = StoreConfig::default().with_block_size(10);
    assert!(matches!(
        SchemaStore::create(&root, cfg),
        Err(StoreError::Config(_))
    ));
}
