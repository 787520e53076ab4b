//! Query executor (C8, spec §4.8). A document-at-a-time lower-bound loop
//! over an `OperatorNode` tree, with cooperative cancellation. Grounded on
//! the teacher's `search/executor.rs` (`ExecutionConfig`, the segment-loop
//! shape of `QueryExecutor::execute`), restated over
//! `OperatorNode::lower_bound` instead of `DocumentMatcher::matches`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::error::{retry_on_memory_exhaust, Result};
use crate::core::types::DocId;
use crate::pager::Pager;
use crate::query::operator::{DocumentScore, OperatorNode};
use crate::search::info::SearchInformation;

/// Shared flag polled every [`Executor::CHECK_INTERVAL`] iterations (spec
/// §4.8 "Cancellation", §5 "cooperative only"). Cloning shares the same
/// underlying flag, so a caller can hand one to a running `Executor` from
/// another thread (e.g. a timeout watchdog) and cancel it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How the executor advances from one matched id to the next candidate
/// (spec §4.8's `next_id`).
pub enum ExecutorMode {
    /// Scan every id in `[begin, end]` (inclusive), advancing by 1.
    Interval { begin: DocId, end: DocId },
    /// Visit only the ids in this pre-sorted narrowing vector (spec §4.8:
    /// "a sorted narrowing vector"), e.g. a bitset projection from a prior
    /// query or an explicit ROWID list.
    Narrowing(Vec<DocId>),
}

/// One collected match: the id and, when scoring was requested, its score
/// (spec §4.7: "`getScore` is called only on matched ids").
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub doc_id: DocId,
    pub score: Option<DocumentScore>,
}

/// Single-threaded document-at-a-time executor (spec §4.8). One `Executor`
/// corresponds to one worker in the parallel orchestrator (C12): a
/// multi-worker search clones the tree and constructs one `Executor` per
/// band rather than sharing this state across threads.
pub struct Executor {
    mode: ExecutorMode,
    want_score: bool,
    cancel: CancelToken,
}

impl Executor {
    /// Cooperative cancellation is checked once every this many iterations
    /// (spec §4.8/§5: "every N iterations... checks a shared atomic flag").
    const CHECK_INTERVAL: u32 = 1024;

    pub fn new(mode: ExecutorMode, want_score: bool) -> Self {
        Executor { mode, want_score, cancel: CancelToken::new() }
    }

    pub fn with_cancel_token(mode: ExecutorMode, want_score: bool, cancel: CancelToken) -> Self {
        Executor { mode, want_score, cancel }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the lower-bound loop to completion (or until cancelled),
    /// collecting every matched id into the returned buffer (spec §4.8's
    /// pseudocode). The post-loop resort to a requested sort key is the
    /// caller's job (`search::results::ResultSet`), not this loop's.
    pub fn run(&mut self, si: &SearchInformation, root: &mut dyn OperatorNode) -> Vec<Hit> {
        let mut hits = Vec::new();
        let mut iterations: u32 = 0;

        let mut id = match &self.mode {
            ExecutorMode::Interval { begin, .. } => *begin,
            ExecutorMode::Narrowing(ids) => match ids.first() {
                Some(first) => *first,
                None => return hits,
            },
        };
        let mut narrow_index = 0usize;

        while id.is_defined() {
            iterations += 1;
            if iterations % Self::CHECK_INTERVAL == 0 && self.cancel.is_cancelled() {
                break;
            }

            let matched = root.lower_bound(si, id, false);
            if !matched.is_defined() {
                break;
            }
            if !self.id_in_range(matched) {
                id = self.next_id(matched, &mut narrow_index);
                continue;
            }

            let score = if self.want_score { Some(root.get_score(si)) } else { None };
            hits.push(Hit { doc_id: matched, score });
            id = self.next_id(matched, &mut narrow_index);
        }
        hits
    }

    fn id_in_range(&self, id: DocId) -> bool {
        match &self.mode {
            ExecutorMode::Interval { end, .. } => id <= *end,
            ExecutorMode::Narrowing(_) => true,
        }
    }

    fn next_id(&self, matched: DocId, narrow_index: &mut usize) -> DocId {
        match &self.mode {
            ExecutorMode::Interval { .. } => DocId(matched.0.wrapping_add(1)),
            ExecutorMode::Narrowing(ids) => {
                while *narrow_index < ids.len() && ids[*narrow_index] <= matched {
                    *narrow_index += 1;
                }
                ids.get(*narrow_index).copied().unwrap_or(DocId::UNDEFINED)
            }
        }
    }
}

/// The search entry point's retry wrapper (spec §7/SPEC_FULL A.1). `run`
/// itself can't fail (`OperatorNode`'s leaf/iterator contract is infallible),
/// so the fallible part of a search lives in what builds the operator tree
/// before `Executor::run` is reached — opening inverted-file pagers,
/// fixing the leaf chain's first page, and so on. `build_and_execute` wraps
/// that whole build-plus-run and gets one aggressive unfix-and-retry pass
/// over `pagers` if it surfaces a `MemoryExhaust`.
pub fn run_with_memory_retry<T>(
    catch_memory_exhaust: bool,
    pagers: &[&Pager],
    build_and_execute: impl FnMut() -> Result<T>,
) -> Result<T> {
    retry_on_memory_exhaust(catch_memory_exhaust, build_and_execute, || {
        for pager in pagers {
            let _ = pager.release_on_use();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::leaf::SimpleLeafNode;
    use crate::query::operator::OperatorTermNode;
    use crate::inverted::iter::TermListIterator;
    use crate::inverted::posting::PostingList;

    fn term_node(docs: &[(u32, Vec<u32>, u32)]) -> OperatorTermNode {
        let mut list = PostingList::new();
        for (doc, positions, len) in docs {
            list.push(DocId(*doc), positions.clone(), *len).unwrap();
        }
        OperatorTermNode::new(Box::new(SimpleLeafNode::new(Box::new(TermListIterator::new(list)))))
    }

    #[test]
    fn interval_mode_collects_every_match_in_range() {
        let si = SearchInformation::new(3, 10.0);
        let mut root = term_node(&[(0, vec![0], 3), (2, vec![0], 3), (5, vec![0], 3)]);
        let mut exec = Executor::new(ExecutorMode::Interval { begin: DocId(0), end: DocId(3) }, false);
        let hits = exec.run(&si, &mut root);
        assert_eq!(hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![DocId(0), DocId(2)]);
    }

    #[test]
    fn narrowing_mode_only_visits_listed_ids() {
        let si = SearchInformation::new(3, 10.0);
        let mut root = term_node(&[(0, vec![0], 3), (2, vec![0], 3), (5, vec![0], 3)]);
        let mut exec = Executor::new(ExecutorMode::Narrowing(vec![DocId(2), DocId(5)]), false);
        let hits = exec.run(&si, &mut root);
        assert_eq!(hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![DocId(2), DocId(5)]);
    }

    #[test]
    fn cancellation_stops_the_loop_early() {
        let si = SearchInformation::new(3, 10.0);
        let docs: Vec<(u32, Vec<u32>, u32)> = (0..5000).map(|i| (i, vec![0], 3)).collect();
        let mut root = term_node(&docs);
        let mut exec = Executor::new(ExecutorMode::Interval { begin: DocId(0), end: DocId(9999) }, false);
        let token = exec.cancel_token();
        token.cancel();
        let hits = exec.run(&si, &mut root);
        assert!(hits.len() < 5000);
    }
}
