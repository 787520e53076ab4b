//! Search information (spec §3.1): the per-query bundle of corpus and
//! per-document statistics that scoring, clustering and KWIC extraction all
//! read. Grounded on the teacher's `search/executor.rs` (`ExecutionConfig`)
//! and `scoring/scorer.rs` (the document-length/average-length inputs a
//! BM25-style scorer needs), extended with the per-document feature-set
//! and section-size vectors spec §4.9 requires for clustering and
//! projection support.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::types::DocId;

/// One weighted term in a document's feature vector (spec §4.9's
/// `FeatureValue` / `WordData`).
#[derive(Debug, Clone, PartialEq)]
pub struct WordData {
    pub term: String,
    pub weight: f64,
}

/// Per-document statistics independent of any one query (spec §3.1).
#[derive(Debug, Clone, Default)]
pub struct DocumentStats {
    /// Normalized length (e.g. token count after stopword removal).
    pub normalized_length: u32,
    /// Original length (e.g. raw token count), used by coarse-KWIC to map
    /// back to original coordinates (spec §4.9).
    pub original_length: u32,
    /// Per-section token counts, for the `Section` projection.
    pub section_sizes: Vec<u32>,
    /// Feature vector, reference-shared since many result rows may share
    /// the same document's feature set during clustering (spec §3.4).
    pub feature_set: Arc<Vec<WordData>>,
}

/// Per-query scoring parameters (left generic: the scoring formula itself
/// is an external collaborator per spec §1, this struct only carries the
/// inputs a BM25-family scorer needs).
#[derive(Debug, Clone, Copy)]
pub struct ScoringParameters {
    pub k1: f64,
    pub b: f64,
}

impl Default for ScoringParameters {
    fn default() -> Self {
        ScoringParameters { k1: 1.2, b: 0.75 }
    }
}

/// The per-query bundle threaded through every `ListIterator`/`LeafNode`/
/// `OperatorNode` call (spec §3.1, §4.5-§4.8's `si` parameter).
#[derive(Debug, Clone)]
pub struct SearchInformation {
    pub document_count: u32,
    pub average_document_length: f64,
    pub scoring: ScoringParameters,
    /// When set, position-level verification is skipped even where a
    /// caller did not explicitly request `is_rough` (spec §4.6: the
    /// "nolocation" flag applies file-wide, e.g. when the schema has no
    /// position index).
    pub no_location: bool,
    documents: HashMap<DocId, DocumentStats>,
}

impl SearchInformation {
    pub fn new(document_count: u32, average_document_length: f64) -> Self {
        SearchInformation {
            document_count,
            average_document_length,
            scoring: ScoringParameters::default(),
            no_location: false,
            documents: HashMap::new(),
        }
    }

    pub fn set_document_stats(&mut self, doc: DocId, stats: DocumentStats) {
        self.documents.insert(doc, stats);
    }

    pub fn document_stats(&self, doc: DocId) -> Option<&DocumentStats> {
        self.documents.get(&doc)
    }

    pub fn document_length(&self, doc: DocId) -> u32 {
        self.documents.get(&doc).map(|s| s.normalized_length).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_length_defaults_to_zero_for_unknown_doc() {
        let si = SearchInformation::new(10, 50.0);
        assert_eq!(si.document_length(DocId(3)), 0);
    }

    #[test]
    fn set_and_read_document_stats() {
        let mut si = SearchInformation::new(1, 10.0);
        si.set_document_stats(
            DocId(0),
            DocumentStats {
                normalized_length: 42,
                original_length: 50,
                section_sizes: vec![10, 32],
                feature_set: Arc::new(vec![WordData { term: "fox".into(), weight: 0.5 }]),
            },
        );
        assert_eq!(si.document_length(DocId(0)), 42);
        assert_eq!(si.document_stats(DocId(0)).unwrap().section_sizes, vec![10, 32]);
    }
}
