//! Benchmarks for the core write/read paths: B+tree insert (single and
//! batched), range scan, and inverted-index phrase query through the
//! parallel orchestrator.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;

use duoindex::analysis::{SimpleTokenizer, Tokenizer};
use duoindex::btree::{BTreeFile, Bound, SearchCondition};
use duoindex::core::{BTreeFileOptions, DocId, FieldType, FieldValue, SortDirection, TransactionHandle};
use duoindex::inverted::InvertedFile;
use duoindex::parallel::{partition_by_cost, Orchestrator};
use duoindex::query::{OperatorTermNode, SimpleLeafNode};
use duoindex::search::results::SortOrder;
use duoindex::search::{SearchInformation, SortKey};

fn int_options() -> BTreeFileOptions {
    BTreeFileOptions::new(vec![FieldType::Int32], vec![0], vec![SortDirection::Ascending])
}

fn bench_single_insert(c: &mut Criterion) {
    c.bench_function("btree_single_insert", |b| {
        let dir = tempfile::tempdir().unwrap();
        let mut file = BTreeFile::create(dir.path(), int_options(), 8 * 1024, 256).unwrap();
        let mut tx = TransactionHandle::new();
        let mut key = 0i32;
        b.iter(|| {
            file.insert(&mut tx, vec![FieldValue::Int32(key)], b"payload").unwrap();
            key += 1;
        });
    });
}

fn bench_batch_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_batch_insert");
    for batch_size in [10usize, 50, 100, 500, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch_size, |b, &batch_size| {
            b.iter_batched(
                || {
                    let dir = tempfile::tempdir().unwrap();
                    let file = BTreeFile::create(dir.path(), int_options(), 8 * 1024, 256).unwrap();
                    (dir, file, TransactionHandle::new())
                },
                |(dir, mut file, mut tx)| {
                    for k in 0..batch_size as i32 {
                        file.insert(&mut tx, vec![FieldValue::Int32(black_box(k))], b"payload").unwrap();
                    }
                    drop(dir);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_range_scan(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut file = BTreeFile::create(dir.path(), int_options(), 8 * 1024, 512).unwrap();
    let mut tx = TransactionHandle::new();
    for k in 0..5000i32 {
        file.insert(&mut tx, vec![FieldValue::Int32(k)], b"payload").unwrap();
    }

    c.bench_function("btree_range_scan_half", |b| {
        b.iter(|| {
            let rows = file
                .search(
                    &mut tx,
                    SearchCondition::Range {
                        lower: Some(Bound { key: vec![FieldValue::Int32(2500)], inclusive: true }),
                        upper: None,
                    },
                )
                .unwrap();
            black_box(rows.len());
        });
    });
}

fn random_document(rng: &mut impl Rng, vocab: &[&str], words: usize) -> String {
    (0..words).map(|_| vocab[rng.gen_range(0..vocab.len())]).collect::<Vec<_>>().join(" ")
}

fn bench_phrase_query_parallel(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut inverted = InvertedFile::create(dir.path()).unwrap();
    let tokenizer = SimpleTokenizer::new();
    let mut rng = rand::thread_rng();
    let vocab = ["the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog"];

    let document_count = 4000u32;
    for i in 0..document_count {
        let text = random_document(&mut rng, &vocab, 40);
        let tokens = tokenizer.tokenize(&text);
        inverted.index_document(DocId(i), &tokens).unwrap();
    }
    inverted.compact().unwrap();

    let si = SearchInformation::new(document_count, 40.0);
    let orchestrator = Orchestrator::with_default_workers();
    let bands = partition_by_cost(document_count, &[], orchestrator.workers());

    c.bench_function("inverted_term_query_parallel", |b| {
        b.iter(|| {
            let result = orchestrator.run(&bands, &si, true, SortKey::Score, SortOrder::Descending, |_band| {
                let iter = inverted.list_iterator("fox").unwrap();
                Box::new(OperatorTermNode::new(Box::new(SimpleLeafNode::new(iter))))
                    as Box<dyn duoindex::query::OperatorNode>
            });
            black_box(result.len());
        });
    });
}

criterion_group!(
    benches,
    bench_single_insert,
    bench_batch_insert,
    bench_range_scan,
    bench_phrase_query_parallel
);
criterion_main!(benches);
