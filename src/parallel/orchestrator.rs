//! Parallel query orchestrator (C12, spec §4.12). Splits the doc-id space
//! into bands, runs one [`Executor`] per band on a `rayon` worker, and
//! merges the per-band hits back into a single [`ResultSet`] ordered by the
//! requested sort key.
//!
//! Grounded on the teacher's `parallel/indexer.rs` (`ParallelIndexer`:
//! `rayon::prelude::*`, a `par_iter`/`par_chunks` fan-out with an
//! `AtomicUsize` progress counter) and `parallel/merger.rs` (the
//! tier-grouped, then per-tier merge shape of `SegmentMerger::merge`),
//! restated over query bands instead of index segments. The band-result
//! collection point uses a `crossbeam::channel`, the same pattern the
//! teacher's `writer/parallel_writer.rs` uses to gather worker output
//! off the `rayon` pool.
//!
//! The spec's `copy()` (a deep clone of the `OperatorNode` tree handed to
//! each worker) has no direct Rust counterpart: `Box<dyn OperatorNode>`
//! is not `Clone`-able without adding a `clone_box` method to every leaf
//! and combinator, which would ripple through `query::leaf`'s pooled
//! iterators (`Rc<RefCell<LocationListManager>>`, themselves not `Send`).
//! This orchestrator instead takes a tree-building closure and calls it
//! once per band — each worker constructs (and, within the same `rayon`
//! task, fully consumes) its own tree, so the non-`Send` pooled state
//! never needs to cross a thread boundary. This is recorded as a
//! deliberate redesign, not an oversight.

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::channel::bounded;
use rayon::prelude::*;

use crate::core::types::DocId;
use crate::query::operator::OperatorNode;
use crate::search::executor::{Executor, ExecutorMode, Hit};
use crate::search::info::SearchInformation;
use crate::search::results::{ResultSet, SortKey, SortOrder};

/// A contiguous, inclusive doc-id range assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub begin: DocId,
    pub end: DocId,
}

/// Split `[0, document_count)` into `workers` contiguous bands, weighted
/// by a per-document cost estimate when one is supplied (spec §4.12:
/// "partition the doc-id space into K bands of approximately equal
/// expected cost"). Falls back to equal-sized bands when `costs` is
/// empty or shorter than `document_count` (no estimate available).
pub fn partition_by_cost(document_count: u32, costs: &[u64], workers: usize) -> Vec<Band> {
    let workers = workers.max(1);
    if document_count == 0 {
        return Vec::new();
    }
    if (costs.len() as u32) < document_count {
        return partition_evenly(document_count, workers);
    }

    let total: u64 = costs.iter().sum();
    if total == 0 {
        return partition_evenly(document_count, workers);
    }
    let target = (total / workers as u64).max(1);

    let mut bands = Vec::with_capacity(workers);
    let mut band_start = 0u32;
    let mut accumulated = 0u64;
    for (id, &cost) in costs.iter().enumerate().take(document_count as usize) {
        accumulated += cost;
        let is_last_doc = id as u32 + 1 == document_count;
        let band_full = accumulated >= target && bands.len() + 1 < workers;
        if band_full || is_last_doc {
            bands.push(Band { begin: DocId(band_start), end: DocId(id as u32) });
            band_start = id as u32 + 1;
            accumulated = 0;
        }
    }
    bands
}

fn partition_evenly(document_count: u32, workers: usize) -> Vec<Band> {
    let workers = workers.min(document_count.max(1) as usize).max(1);
    let base = document_count / workers as u32;
    let remainder = document_count % workers as u32;
    let mut bands = Vec::with_capacity(workers);
    let mut start = 0u32;
    for w in 0..workers {
        let size = base + if (w as u32) < remainder { 1 } else { 0 };
        if size == 0 {
            continue;
        }
        bands.push(Band { begin: DocId(start), end: DocId(start + size - 1) });
        start += size;
    }
    bands
}

/// Drives `workers` bands of a query tree to completion in parallel and
/// merges their hits into one [`ResultSet`] (spec §4.12).
pub struct Orchestrator {
    workers: usize,
}

impl Orchestrator {
    pub fn new(workers: usize) -> Self {
        Orchestrator { workers: workers.max(1) }
    }

    pub fn with_default_workers() -> Self {
        Orchestrator::new(num_cpus::get())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `build` once per band, each producing a fresh `OperatorNode`
    /// tree scoped to that worker's `Executor`, then merge the resulting
    /// hits ordered by `(key, order)` (spec §4.12's "K-way merge by the
    /// requested sort key").
    pub fn run<F>(&self, bands: &[Band], si: &SearchInformation, want_score: bool, key: SortKey, order: SortOrder, build: F) -> ResultSet
    where
        F: Fn(Band) -> Box<dyn OperatorNode> + Sync,
    {
        let completed = Arc::new(AtomicUsize::new(0));
        let total = bands.len();
        let (sender, receiver) = bounded(total);

        bands.par_iter().enumerate().for_each_with(sender, |sender, (idx, &band)| {
            let mut root = build(band);
            let mut executor = Executor::new(ExecutorMode::Interval { begin: band.begin, end: band.end }, want_score);
            let hits = executor.run(si, root.as_mut());
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            log::debug!("orchestrator: band {:?}..{:?} done ({done}/{total})", band.begin, band.end);
            sender.send((idx, hits)).expect("merge-side receiver outlives every band worker");
        });

        let mut per_band: Vec<Vec<Hit>> = vec![Vec::new(); total];
        for (idx, hits) in receiver.try_iter() {
            per_band[idx] = hits;
        }

        merge_bands(per_band, key, order)
    }
}

/// K-way merge of per-band hit vectors into one [`ResultSet`]. Bands are
/// disjoint, increasing doc-id ranges, so a `DocId`-keyed merge is a
/// plain concatenation; a `Score`-keyed merge sorts each band locally
/// first, then merges with a binary heap (grounded on `inverted::iter`'s
/// `MultiListIterator` heap-of-cursors shape, restated over score instead
/// of doc-id).
fn merge_bands(mut bands: Vec<Vec<Hit>>, key: SortKey, order: SortOrder) -> ResultSet {
    match key {
        SortKey::DocId => {
            let mut hits: Vec<Hit> = bands.into_iter().flatten().collect();
            if order == SortOrder::Desc {
                hits.reverse();
            }
            ResultSet::from_hits(hits)
        }
        SortKey::Score => {
            for band in &mut bands {
                band.sort_by(|a, b| score_of(a).partial_cmp(&score_of(b)).unwrap_or(std::cmp::Ordering::Equal));
            }

            let mut heap = BinaryHeap::new();
            for (band_idx, band) in bands.iter().enumerate() {
                if !band.is_empty() {
                    heap.push(HeapEntry { score: score_of(&band[0]), band: band_idx, slot: 0 });
                }
            }

            let mut merged = Vec::new();
            while let Some(HeapEntry { band, slot, .. }) = heap.pop() {
                merged.push(bands[band][slot]);
                if slot + 1 < bands[band].len() {
                    heap.push(HeapEntry { score: score_of(&bands[band][slot + 1]), band, slot: slot + 1 });
                }
            }
            if order == SortOrder::Desc {
                merged.reverse();
            }
            ResultSet::from_hits(merged)
        }
    }
}

fn score_of(hit: &Hit) -> f64 {
    hit.score.unwrap_or(0.0)
}

/// One band's current head, ordered so `BinaryHeap` (a max-heap) pops the
/// lowest score first — matching `merge_bands`'s ascending local sort.
struct HeapEntry {
    score: f64,
    band: usize,
    slot: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.score.partial_cmp(&self.score).unwrap_or(std::cmp::Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inverted::iter::TermListIterator;
    use crate::inverted::posting::PostingList;
    use crate::query::leaf::SimpleLeafNode;
    use crate::query::operator::OperatorTermNode;

    fn term_tree(docs: &[(u32, Vec<u32>, u32)], band: Band) -> Box<dyn OperatorNode> {
        let mut list = PostingList::new();
        for (doc, positions, len) in docs {
            if DocId(*doc) >= band.begin && DocId(*doc) <= band.end {
                list.push(DocId(*doc), positions.clone(), *len).unwrap();
            }
        }
        Box::new(OperatorTermNode::new(Box::new(SimpleLeafNode::new(Box::new(TermListIterator::new(list))))))
    }

    #[test]
    fn partition_evenly_covers_every_doc_id_exactly_once() {
        let bands = partition_evenly(10, 3);
        let mut seen = Vec::new();
        for band in &bands {
            for id in band.begin.0..=band.end.0 {
                seen.push(id);
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn partition_by_cost_respects_skewed_weights() {
        let mut costs = vec![1u64; 10];
        costs[0] = 100;
        let bands = partition_by_cost(10, &costs, 3);
        assert_eq!(bands.first().unwrap().begin, DocId(0));
        assert_eq!(bands.last().unwrap().end, DocId(9));
    }

    #[test]
    fn run_merges_bands_by_doc_id_in_order() {
        let docs: Vec<(u32, Vec<u32>, u32)> = (0..40).map(|i| (i, vec![0], 3)).collect();
        let si = SearchInformation::new(40, 3.0);
        let bands = partition_evenly(40, 4);
        let orchestrator = Orchestrator::new(4);
        let result = orchestrator.run(&bands, &si, false, SortKey::DocId, SortOrder::Asc, |band| term_tree(&docs, band));
        let ids: Vec<u32> = result.rows().iter().map(|r| r.doc_id.0).collect();
        assert_eq!(ids, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn run_merges_bands_by_score_descending() {
        let docs: Vec<(u32, Vec<u32>, u32)> = (0..20).map(|i| (i, vec![0], 3)).collect();
        let si = SearchInformation::new(20, 3.0);
        let bands = partition_evenly(20, 4);
        let orchestrator = Orchestrator::new(4);
        let result = orchestrator.run(&bands, &si, true, SortKey::Score, SortOrder::Desc, |band| term_tree(&docs, band));
        assert_eq!(result.len(), 20);
        let scores: Vec<f64> = result.rows().iter().map(|r| r.score).collect();
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }
}
