//! Demonstrates `Config::page_cache_capacity`/`catch_memory_exhaust`: a
//! B+tree file opened with a deliberately small page-cache budget still
//! produces correct scan results, evicting cold pages under the `lru`
//! policy instead of retaining every page resident (spec §6's
//! `CatchMemoryExhaust` option, §7's `MemoryExhaust` recovery).

use duoindex::btree::{BTreeFile, SearchCondition};
use duoindex::core::{BTreeFileOptions, Config, FieldType, FieldValue, SortDirection, TransactionHandle};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    duoindex::logging::init();

    let dir = tempfile::tempdir()?;
    let mut config = Config::default();
    config.storage_path = dir.path().to_path_buf();
    config.catch_memory_exhaust = true;
    // Small enough that a few hundred leaves will not all fit resident at
    // once, forcing the pager to evict and re-fix from disk mid-scan.
    config.page_cache_capacity = 8;

    let options = BTreeFileOptions::new(
        vec![FieldType::Int32, FieldType::VarChar { max_len: 64 }],
        vec![0, 64],
        vec![SortDirection::Ascending, SortDirection::Ascending],
    );
    let mut file = BTreeFile::create(
        config.storage_path.join("idx_low_mem"),
        options,
        config.page_size,
        config.page_cache_capacity,
    )?;
    let mut tx = TransactionHandle::new();

    println!("Inserting 2000 rows under a {}-page cache budget...", config.page_cache_capacity);
    for i in 0..2000i32 {
        let payload = format!("document body for row {i}");
        file.insert(
            &mut tx,
            vec![FieldValue::Int32(i), FieldValue::Text(format!("row-{i}"))],
            payload.as_bytes(),
        )?;
        if i % 500 == 0 {
            println!("  inserted {i} rows, tree depth = {}", file.tree_depth());
        }
    }

    let rows = file.search(&mut tx, SearchCondition::Scan { reverse: false })?;
    println!("Scan returned {} rows after eviction pressure; first and last:", rows.len());
    println!("  {:?}", rows.first().map(|(k, _)| &k[0]));
    println!("  {:?}", rows.last().map(|(k, _)| &k[0]));
    assert_eq!(rows.len(), 2000, "every inserted row must survive cache eviction");

    let report = file.verify(&mut tx)?;
    if report.is_empty() {
        println!("verify: no structural errors found");
    } else {
        for problem in &report {
            println!("verify: {problem}");
        }
    }

    Ok(())
}
