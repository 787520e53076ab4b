//! `duoindex`: an ordered B+tree engine and an inverted full-text search
//! engine sharing a common page/transaction substrate, implementing
//! secondary indexes for a SQL database kernel.
//!
//! The crate is organized leaves-first, mirroring the component layout of
//! the specification this engine implements:
//!
//! - [`core`] — error taxonomy, configuration, shared types, transaction/
//!   fix-mode handle (ambient, consumed by every other module).
//! - [`pager`] — fix-managed pages sliced into variable-length areas (C1).
//! - [`field`] — null-bitmap + typed field codec for B+tree tuples (C2).
//! - [`btree`] — ordered B+tree node layout and operations (C3/C4).
//! - [`inverted`] — per-term posting lists and scan-cursor iterators (C5).
//! - [`query`] — position-level leaf evaluators and boolean operators over
//!   them (C6/C7).
//! - [`search`] — document-at-a-time executor and result-set
//!   post-processing: scoring blend, clustering, coarse-KWIC (C8/C9).
//! - [`idvector`] — ROWID↔DocID paged vector files (C10).
//! - [`collections`] — chunked growable vector for non-contiguous large
//!   collections (C11).
//! - [`parallel`] — doc-id-band partitioning, tree cloning, K-way merge
//!   across worker executors (C12).
//! - [`compression`] — integer/block codecs shared by `field` and
//!   `inverted`.
//! - [`analysis`] — the tokenizer boundary contract (an external
//!   collaborator in production; a minimal default lives here so the
//!   crate's own tests can drive it end to end).
//! - [`logging`] — library-side `log`/`env_logger` init helper.

pub mod analysis;
pub mod btree;
pub mod collections;
pub mod compression;
pub mod core;
pub mod field;
pub mod idvector;
pub mod inverted;
pub mod logging;
pub mod pager;
pub mod parallel;
pub mod query;
pub mod search;

/// End-to-end scenario tests (spec §8) driven entirely through public
/// surface: `InvertedFile` for indexing, `query`/`search` for evaluation.
/// The B+tree scenarios (unique insert/range scan, split-and-promote,
/// uniqueness violation) live beside `btree::ops` instead, since that
/// module already exercises `BTreeFile` end to end; this module covers the
/// full-text side the same way.
#[cfg(test)]
mod scenarios {
    use crate::analysis::{SimpleTokenizer, Tokenizer};
    use crate::core::types::DocId;
    use crate::inverted::InvertedFile;
    use crate::query::leaf::{LeafNode, NormalLeafNode};
    use crate::query::operator::{OperatorNode, OperatorTermNode};
    use crate::search::executor::{Executor, ExecutorMode};
    use crate::search::info::SearchInformation;

    /// Spec §8 scenario 4: phrase search with position. D1 = "the quick
    /// brown fox" contains "quick brown fox" at consecutive word positions;
    /// D2 = "brown fox quick" contains the same three words out of order
    /// and must not match. `ResultSet.Tf` for D1 is {1,1,1} per-term, which
    /// here shows up as the matched `NormalLeafNode`'s unified term
    /// frequency of 1 (one phrase occurrence).
    #[test]
    fn phrase_search_matches_only_the_aligned_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = InvertedFile::create(dir.path()).unwrap();
        let tokenizer = SimpleTokenizer::new();

        file.index_document(DocId(0), &tokenizer.tokenize("the quick brown fox")).unwrap();
        file.index_document(DocId(1), &tokenizer.tokenize("brown fox quick")).unwrap();

        // Query "quick brown fox": relative word offsets 0, 1, 2 from the
        // first matched token, exactly as `NormalLeafNode` expects them.
        let quick = file.list_iterator("quick").unwrap();
        let brown = file.list_iterator("brown").unwrap();
        let fox = file.list_iterator("fox").unwrap();
        let phrase = NormalLeafNode::build(vec![(0, quick), (1, brown), (2, fox)]);
        let mut root = OperatorTermNode::new(Box::new(phrase));

        let si = SearchInformation::new(2, 4.0);
        let mut executor = Executor::new(ExecutorMode::Interval { begin: DocId(0), end: DocId(1) }, false);
        let hits = executor.run(&si, &mut root);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, DocId(0));
        assert_eq!(root.current(), DocId(0));
    }

    /// Same query, evaluated after compaction flushes the live segment to
    /// the immutable `fst`-backed term dictionary plus postings blob — the
    /// phrase match must be unaffected by which physical form the postings
    /// are read from.
    #[test]
    fn phrase_search_matches_the_same_document_after_compaction() {
        let dir = tempfile::tempdir().unwrap();
        let tokenizer = SimpleTokenizer::new();
        {
            let mut file = InvertedFile::create(dir.path()).unwrap();
            file.index_document(DocId(0), &tokenizer.tokenize("the quick brown fox")).unwrap();
            file.index_document(DocId(1), &tokenizer.tokenize("brown fox quick")).unwrap();
            file.compact().unwrap();
        }
        let file = InvertedFile::open(dir.path()).unwrap();

        let phrase = NormalLeafNode::build(vec![
            (0, file.list_iterator("quick").unwrap()),
            (1, file.list_iterator("brown").unwrap()),
            (2, file.list_iterator("fox").unwrap()),
        ]);
        let si = SearchInformation::new(2, 4.0);
        let mut node = phrase;
        assert_eq!(node.lower_bound(&si, DocId(0), false), DocId(0));
        assert_eq!(node.lower_bound(&si, DocId(1), false), DocId::UNDEFINED);
    }
}
