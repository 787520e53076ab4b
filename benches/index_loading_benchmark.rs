//! Benchmarks for index-build scaling: indexing and compacting an
//! inverted file across document-count orders of magnitude, plus the
//! ROWID↔DocID vector and `LargeVector` container it depends on (C10/C11).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use duoindex::analysis::{SimpleTokenizer, Tokenizer};
use duoindex::collections::LargeVector;
use duoindex::core::DocId;
use duoindex::idvector::RowIdToDocIdVector;
use duoindex::inverted::InvertedFile;

fn build_document(i: usize) -> String {
    format!(
        "document {i} about rust programming search engine database index query with terms \
         repeated across a few hundred documents so term postings actually overlap"
    )
}

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("inverted_index_build");
    for doc_count in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(doc_count), &doc_count, |b, &doc_count| {
            b.iter_batched(
                || tempfile::tempdir().unwrap(),
                |dir| {
                    let mut file = InvertedFile::create(dir.path()).unwrap();
                    let tokenizer = SimpleTokenizer::new();
                    for i in 0..doc_count {
                        let text = build_document(i);
                        let tokens = tokenizer.tokenize(&text);
                        file.index_document(DocId(i as u32), black_box(&tokens)).unwrap();
                    }
                    black_box(file.term_count());
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_index_compact(c: &mut Criterion) {
    let mut group = c.benchmark_group("inverted_index_compact");
    for doc_count in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(doc_count), &doc_count, |b, &doc_count| {
            b.iter_batched(
                || {
                    let dir = tempfile::tempdir().unwrap();
                    let mut file = InvertedFile::create(dir.path()).unwrap();
                    let tokenizer = SimpleTokenizer::new();
                    for i in 0..doc_count {
                        let tokens = tokenizer.tokenize(&build_document(i));
                        file.index_document(DocId(i as u32), &tokens).unwrap();
                    }
                    (dir, file)
                },
                |(dir, mut file)| {
                    file.compact().unwrap();
                    drop(dir);
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_rowid_vector_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("rowid_vector_fill");
    for count in [1_000u32, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let dir = tempfile::tempdir().unwrap();
                    let vector = RowIdToDocIdVector::create(dir.path().join("rowids.bin"), 8 * 1024).unwrap();
                    (dir, vector)
                },
                |(dir, mut vector)| {
                    for i in 0..count {
                        vector.set(duoindex::core::RowId(i as u64), DocId(i)).unwrap();
                    }
                    drop(dir);
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_large_vector_push(c: &mut Criterion) {
    c.bench_function("large_vector_push_1m", |b| {
        b.iter(|| {
            let mut v: LargeVector<u32> = LargeVector::new();
            for i in 0..1_000_000u32 {
                v.push(black_box(i));
            }
            black_box(v.len());
        });
    });
}

criterion_group!(
    benches,
    bench_index_build,
    bench_index_compact,
    bench_rowid_vector_fill,
    bench_large_vector_push
);
criterion_main!(benches);
