use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use schemastore::consts::{BLOCK_HEADER_SIZE, STORE_FILE};
use schemastore::{DynamicRecord, IndexRule, SchemaRule, SchemaStore, StoreConfig, StoreError};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("schemastore-corrupt-{prefix}-{pid}-{t}-{id}"))
}

fn rule(label: i32, key: &str) -> SchemaRule {
    SchemaRule::Index(IndexRule::new(0, label, key))
}

fn block(id: u64, start: bool, next: Option<u64>, data: &[u8]) -> DynamicRecord {
    DynamicRecord {
        id,
        in_use: true,
        start_of_chain: start,
        next,
        data: data.to_vec(),
    }
}

// Перевернуть один байт payload блока `id` прямо в файле.
fn flip_payload_byte(root: &PathBuf, block_size: usize, id: u64) -> Result<()> {
    let path = root.join(STORE_FILE);
    let mut f = OpenOptions::new().read(true).write(true).open(&path)?;
    let off = id * block_size as u64 + BLOCK_HEADER_SIZE as u64;
    f.seek(SeekFrom::Start(off))?;
    let mut b = [0u8; 1];
    f.read_exact(&mut b)?;
    b[0] ^= 0x5A;
    f.seek(SeekFrom::Start(off))?;
    f.write_all(&b)?;
    f.sync_all()?;
    Ok(())
}

#[test]
fn link_to_free_block_is_broken_chain() -> Result<()> {
    let mut store = SchemaStore::in_memory(StoreConfig::default())?;
    let head = store.next_id()?;
    let tail = store.next_id()?;
    store.update_record(&block(head, true, Some(tail), b"abc"))?;
    store.update_record(&DynamicRecord::free(tail))?;

    match store.get_records(head) {
        Err(StoreError::BrokenChain { head: h, block, .. }) => {
            assert_eq!(h, head);
            assert_eq!(block, tail);
        }
        other => panic!("expected BrokenChain, got {other:?}"),
    }
    Ok(())
}

#[test]
fn link_outside_store_is_broken_chain() -> Result<()> {
    let mut store = SchemaStore::in_memory(StoreConfig::default())?;
    let head = store.next_id()?;
    store.update_record(&block(head, true, Some(10_000), b"abc"))?;
    assert!(matches!(
        store.get_records(head),
        Err(StoreError::BrokenChain { block: 10_000, .. })
    ));
    Ok(())
}

#[test]
fn cycle_is_detected() -> Result<()> {
    let mut store = SchemaStore::in_memory(StoreConfig::default())?;
    let a = store.next_id()?;
    let b = store.next_id()?;
    let c = store.next_id()?;
    store.update_record(&block(a, true, Some(b), b"1"))?;
    store.update_record(&block(b, false, Some(c), b"2"))?;
    store.update_record(&block(c, false, Some(b), b"3"))?;

    let err = store.get_records(a).unwrap_err();
    assert!(matches!(err, StoreError::BrokenChain { .. }), "got {err:?}");
    assert!(err.to_string().contains("cycle"));
    Ok(())
}

#[test]
fn chain_length_guard() -> Result<()> {
    let cfg = StoreConfig::default().with_max_chain_blocks(2);
    let mut store = SchemaStore::in_memory(cfg)?;
    let cap = store.block_capacity();

    // Слишком длинное правило отвергается при записи
    let err = store.store_rule(&rule(0, &"z".repeat(cap * 3))).unwrap_err();
    assert!(matches!(err, StoreError::RuleTooLarge { .. }), "got {err:?}");
    assert_eq!(store.load_all().count(), 0);

    let fits = store.store_rule(&rule(0, &"z".repeat(cap)))?;
    assert_eq!(store.get_records(fits)?.len(), 2);

    // Цепочка из трёх блоков, собранная вручную, не читается
    let a = store.next_id()?;
    let b = store.next_id()?;
    let c = store.next_id()?;
    store.update_record(&block(a, true, Some(b), b"1"))?;
    store.update_record(&block(b, false, Some(c), b"2"))?;
    store.update_record(&block(c, false, None, b"3"))?;
    assert!(matches!(
        store.get_records(a),
        Err(StoreError::BrokenChain { .. })
    ));
    Ok(())
}

#[test]
fn non_head_start_is_rejected() -> Result<()> {
    let mut store = SchemaStore::in_memory(StoreConfig::default())?;
    let cap = store.block_capacity();
    let id = store.store_rule(&rule(0, &"q".repeat(cap * 2)))?;
    let second = store.get_records(id)?[1].id;
    assert!(matches!(
        store.get_records(second),
        Err(StoreError::BrokenChain { .. })
    ));
    assert!(matches!(
        store.update_record(&block(0, true, None, b"")),
        Err(StoreError::FormatCorruption { block: 0, .. })
    ));
    Ok(())
}

#[test]
fn garbage_payload_is_format_corruption() -> Result<()> {
    let mut store = SchemaStore::in_memory(StoreConfig::default())?;
    let id = store.next_id()?;
    // kind = 0x7F неизвестен
    store.update_record(&block(id, true, None, &[0, 0, 0, 1, 0x7F, 0, 0]))?;
    assert!(store.get_records(id).is_ok());
    assert!(matches!(
        store.read_rule(id),
        Err(StoreError::FormatCorruption { .. })
    ));
    Ok(())
}

// Битая цепочка даёт один Err-элемент, остальные правила читаются.
#[test]
fn load_all_reports_bad_chain_and_continues() -> Result<()> {
    let mut store = SchemaStore::in_memory(StoreConfig::default())?;
    let good1 = store.store_rule(&rule(1, "one"))?;
    let bad = store.next_id()?;
    store.update_record(&block(bad, true, Some(9_999), b"xx"))?;
    let good2 = store.store_rule(&rule(2, "two"))?;

    let items: Vec<schemastore::Result<SchemaRule>> = store.load_all().collect();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap().id(), good1);
    assert!(matches!(items[1], Err(StoreError::BrokenChain { head, .. }) if head == bad));
    assert_eq!(items[2].as_ref().unwrap().id(), good2);

    // Abort-политика — на уровне вызывающего
    assert!(store
        .load_all()
        .collect::<schemastore::Result<Vec<_>>>()
        .is_err());

    let lenient = store.load_all_lenient();
    assert_eq!(
        lenient,
        vec![rule(1, "one").with_id(good1), rule(2, "two").with_id(good2)]
    );
    Ok(())
}

#[test]
fn flipped_byte_on_disk_is_detected() -> Result<()> {
    let root = unique_root("flip");
    let victim;
    let other;
    {
        let mut store = SchemaStore::create(&root, StoreConfig::default())?;
        victim = store.store_rule(&rule(4, "victim"))?;
        other = store.store_rule(&rule(5, "other"))?;
        store.close()?;
    }
    flip_payload_byte(&root, StoreConfig::default().block_size, victim)?;

    let store = SchemaStore::open(&root, StoreConfig::default())?;
    assert!(matches!(
        store.get_records(victim),
        Err(StoreError::FormatCorruption { block, .. }) if block == victim
    ));
    assert_eq!(store.read_rule(other)?, rule(5, "other").with_id(other));
    assert_eq!(store.load_all_lenient().len(), 1);
    assert_eq!(store.load_all().count(), 2);
    store.close()?;

    // Без проверки crc блок читается (и payload декодируется в другой ключ/ошибку)
    let store = SchemaStore::open(&root, StoreConfig::default().with_verify_checksums(false))?;
    assert!(store.get_records(victim).is_ok());
    store.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn check_reports_orphans_and_bad_chains() -> Result<()> {
    let mut store = SchemaStore::in_memory(StoreConfig::default())?;
    let cap = store.block_capacity();
    let ok = store.store_rule(&rule(1, "fine"))?;
    let long = store.store_rule(&rule(2, &"w".repeat(cap * 2)))?;
    let chain: Vec<u64> = store.get_records(long)?.iter().map(|r| r.id).collect();

    // Голова длинной цепочки исчезла — продолжения становятся сиротами
    store.update_record(&DynamicRecord::free(long))?;
    let broken = store.next_id()?;
    store.update_record(&block(broken, true, Some(50_000), b"?"))?;

    let report = store.check()?;
    assert!(!report.is_clean());
    assert_eq!(report.chains_ok, 1);
    assert_eq!(report.bad_chains.len(), 1);
    assert_eq!(report.bad_chains[0].head, broken);
    assert_eq!(report.orphan_blocks, chain[1..].to_vec());
    assert_eq!(store.read_rule(ok)?.id(), ok);
    Ok(())
}

// Повреждённый свободный блок не мешает полному сканированию.
#[test]
fn load_all_skips_damaged_free_block() -> Result<()> {
    let root = unique_root("freeflip");
    let one;
    let two;
    let three;
    {
        let mut store = SchemaStore::create(&root, StoreConfig::default())?;
        one = store.store_rule(&rule(1, "one"))?;
        two = store.store_rule(&rule(2, "two"))?;
        three = store.store_rule(&rule(3, "three"))?;
        store.free_chain(two)?;
        store.close()?;
    }
    flip_payload_byte(&root, StoreConfig::default().block_size, two)?;

    let store = SchemaStore::open(&root, StoreConfig::default())?;
    let loaded: Vec<SchemaRule> = store.load_all().collect::<schemastore::Result<_>>()?;
    assert_eq!(
        loaded,
        vec![rule(1, "one").with_id(one), rule(3, "three").with_id(three)]
    );
    // check видит повреждение
    let report = store.check()?;
    assert_eq!(report.unreadable_blocks.len(), 1);
    assert_eq!(report.unreadable_blocks[0].head, two);
    store.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

// Повреждённое продолжение даёт ровно один Err — от своей цепочки.
#[test]
fn damaged_continuation_is_reported_once() -> Result<()> {
    let root = unique_root("contflip");
    let cfg = StoreConfig::default();
    let long;
    let short;
    let chain: Vec<u64>;
    {
        let mut store = SchemaStore::create(&root, cfg.clone())?;
        let cap = store.block_capacity();
        long = store.store_rule(&rule(1, &"c".repeat(cap * 2)))?;
        short = store.store_rule(&rule(2, "short"))?;
        chain = store.get_records(long)?.iter().map(|r| r.id).collect();
        store.close()?;
    }
    assert_eq!(chain.len(), 3);
    flip_payload_byte(&root, cfg.block_size, chain[1])?;

    let store = SchemaStore::open(&root, cfg)?;
    let items: Vec<schemastore::Result<SchemaRule>> = store.load_all().collect();
    assert_eq!(items.len(), 2);
    assert!(matches!(
        items[0],
        Err(StoreError::FormatCorruption { block, .. }) if block == chain[1]
    ));
    assert_eq!(items[1].as_ref().unwrap(), &rule(2, "short").with_id(short));
    store.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

// Целая часть битой цепочки не попадает в сироты.
#[test]
fn check_does_not_orphan_prefix_of_bad_chain() -> Result<()> {
    let mut store = SchemaStore::in_memory(StoreConfig::default())?;
    let a = store.next_id()?;
    let b = store.next_id()?;
    let c = store.next_id()?;
    store.update_record(&block(a, true, Some(b), b"1"))?;
    store.update_record(&block(b, false, Some(c), b"2"))?;
    store.update_record(&block(c, false, Some(50_000), b"3"))?;

    let report = store.check()?;
    assert_eq!(report.bad_chains.len(), 1);
    assert_eq!(report.bad_chains[0].head, a);
    assert!(report.orphan_blocks.is_empty(), "{:?}", report.orphan_blocks);
    Ok(())
}
