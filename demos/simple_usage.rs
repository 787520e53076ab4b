//! End-to-end walkthrough of both subsystems: a unique B+tree secondary
//! index, and an inverted full-text index queried through the
//! LeafNode/OperatorNode/Executor/ResultSet pipeline.

use duoindex::core::{BTreeFileOptions, FieldType, FieldValue, SortDirection, TransactionHandle};
use duoindex::btree::{BTreeFile, Bound, SearchCondition};
use duoindex::core::DocId;
use duoindex::analysis::{SimpleTokenizer, Tokenizer};
use duoindex::inverted::InvertedFile;
use duoindex::query::{OperatorTermNode, SimpleLeafNode};
use duoindex::search::{Executor, ExecutorMode, ResultSet, SearchInformation, SortKey, results::SortOrder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    duoindex::logging::init();

    let dir = tempfile::tempdir()?;

    // --- B+tree: a unique single-column index over (id INT). -------------
    println!("B+tree: unique insert + range scan");
    let btree_dir = dir.path().join("idx_id");
    let options = BTreeFileOptions::new(
        vec![FieldType::Int32],
        vec![0],
        vec![SortDirection::Ascending],
    );
    let mut file = BTreeFile::create(&btree_dir, options, 8 * 1024, 64)?;
    let mut tx = TransactionHandle::new();

    for (k, v) in [(1, "a"), (3, "c"), (2, "b")] {
        file.insert(&mut tx, vec![FieldValue::Int32(k)], v.as_bytes())?;
    }

    let rows = file.search(
        &mut tx,
        SearchCondition::Range {
            lower: Some(Bound { key: vec![FieldValue::Int32(2)], inclusive: true }),
            upper: None,
        },
    )?;
    for (key, payload) in &rows {
        println!("  {:?} -> {}", key[0], String::from_utf8_lossy(payload));
    }

    match file.insert(&mut tx, vec![FieldValue::Int32(2)], b"duplicate") {
        Err(e) => println!("  re-inserting key 2 correctly failed: {e}"),
        Ok(_) => println!("  unexpected: duplicate key insert succeeded"),
    }

    // --- Inverted index: phrase search over tokenized documents. ---------
    println!("\nInverted index: phrase search");
    let inv_dir = dir.path().join("idx_body");
    let mut inverted = InvertedFile::create(&inv_dir)?;
    let tokenizer = SimpleTokenizer::new();

    let documents = ["the quick brown fox", "brown fox quick"];
    for (i, text) in documents.iter().enumerate() {
        let tokens = tokenizer.tokenize(text);
        inverted.index_document(DocId(i as u32), &tokens)?;
    }

    let si = SearchInformation::new(documents.len() as u32, 4.0);
    let fox_iter = inverted.list_iterator("fox")?;
    let mut root = OperatorTermNode::new(Box::new(SimpleLeafNode::new(fox_iter)));

    let mut executor = Executor::new(
        ExecutorMode::Interval { begin: DocId(0), end: DocId(documents.len() as u32 - 1) },
        true,
    );
    let hits = executor.run(&si, &mut root);

    let mut result_set = ResultSet::from_hits(hits);
    result_set.sort_by(SortKey::Score, SortOrder::Descending);
    println!("  'fox' matched {} document(s)", result_set.len());
    for row in result_set.rows() {
        println!("    doc {:?} score {:.3}", row.doc_id, row.score);
    }

    Ok(())
}
