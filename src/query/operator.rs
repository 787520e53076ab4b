//! OperatorNode tree (C7, spec §4.7). Boolean combinators over `LeafNode`s
//! (and over each other), plus the scoring terminal that wraps a LeafNode
//! and contributes TF/DF to a scorer. Grounded on the teacher's
//! `query/ast.rs` (`BoolQuery` enum of combinators) generalized from a
//! fixed AST to the document-at-a-time merge contract spec §4.7/§4.8 need.

use crate::core::types::DocId;
use crate::search::info::SearchInformation;

use super::leaf::LeafNode;

/// A document's relevance score for one query (spec §4.7: "64-bit double").
pub type DocumentScore = f64;

/// Shared contract for boolean combinators and the scoring terminal (spec
/// §4.7). `lower_bound`/`reset` mirror `LeafNode`'s contract exactly;
/// `get_score` is defined only on matched ids.
pub trait OperatorNode {
    fn reset(&mut self);

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, is_rough: bool) -> DocId;

    fn current(&self) -> DocId;

    /// Only called on an id this node has just matched via `lower_bound`.
    fn get_score(&self, si: &SearchInformation) -> DocumentScore;
}

fn bm25_term_score(si: &SearchInformation, doc: DocId, term_frequency: u32, document_frequency: u32) -> DocumentScore {
    if term_frequency == 0 || document_frequency == 0 || si.document_count == 0 {
        return 0.0;
    }
    let k1 = si.scoring.k1;
    let b = si.scoring.b;
    let tf = term_frequency as f64;
    let n = si.document_count as f64;
    let df = document_frequency as f64;
    let dl = si.document_length(doc).max(1) as f64;
    let avgdl = si.average_document_length.max(1.0);
    let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
    idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * (dl / avgdl)))
}

/// Wraps a single `LeafNode` as a scoring leaf in an OperatorNode tree
/// (spec §4.7): the one place TF/DF reach the scorer.
pub struct OperatorTermNode {
    leaf: Box<dyn LeafNode>,
}

impl OperatorTermNode {
    pub fn new(leaf: Box<dyn LeafNode>) -> Self {
        OperatorTermNode { leaf }
    }
}

impl OperatorNode for OperatorTermNode {
    fn reset(&mut self) {
        self.leaf.reset();
    }

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, is_rough: bool) -> DocId {
        self.leaf.lower_bound(si, id, is_rough)
    }

    fn current(&self) -> DocId {
        self.leaf.current()
    }

    fn get_score(&self, si: &SearchInformation) -> DocumentScore {
        bm25_term_score(si, self.leaf.current(), self.leaf.term_frequency(), self.leaf.estimate_count())
    }
}

/// Conjunction: matches only where every operand matches (spec §4.7).
pub struct And {
    operands: Vec<Box<dyn OperatorNode>>,
    current: DocId,
}

impl And {
    pub fn new(operands: Vec<Box<dyn OperatorNode>>) -> Self {
        And { operands, current: DocId::UNDEFINED }
    }
}

impl OperatorNode for And {
    fn reset(&mut self) {
        for op in &mut self.operands {
            op.reset();
        }
        self.current = DocId::UNDEFINED;
    }

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, is_rough: bool) -> DocId {
        if self.current.is_defined() && id <= self.current {
            return self.current;
        }
        if self.operands.is_empty() {
            self.current = DocId::UNDEFINED;
            return self.current;
        }
        let mut candidate = id;
        loop {
            let mut max_seen = candidate;
            let mut agree = true;
            for op in &mut self.operands {
                let got = op.lower_bound(si, candidate, is_rough);
                if !got.is_defined() {
                    self.current = DocId::UNDEFINED;
                    return self.current;
                }
                if got != candidate {
                    agree = false;
                }
                if got > max_seen {
                    max_seen = got;
                }
            }
            if agree {
                self.current = candidate;
                return self.current;
            }
            candidate = max_seen;
        }
    }

    fn current(&self) -> DocId {
        self.current
    }

    fn get_score(&self, si: &SearchInformation) -> DocumentScore {
        self.operands.iter().map(|op| op.get_score(si)).sum()
    }
}

/// Disjunction: matches where any operand matches, at the smallest such id
/// (spec §4.7).
pub struct Or {
    operands: Vec<Box<dyn OperatorNode>>,
    current: DocId,
}

impl Or {
    pub fn new(operands: Vec<Box<dyn OperatorNode>>) -> Self {
        Or { operands, current: DocId::UNDEFINED }
    }
}

impl OperatorNode for Or {
    fn reset(&mut self) {
        for op in &mut self.operands {
            op.reset();
        }
        self.current = DocId::UNDEFINED;
    }

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, is_rough: bool) -> DocId {
        if self.current.is_defined() && id <= self.current {
            return self.current;
        }
        let mut best = DocId::UNDEFINED;
        for op in &mut self.operands {
            let got = op.lower_bound(si, id, is_rough);
            if got.is_defined() && (!best.is_defined() || got < best) {
                best = got;
            }
        }
        self.current = best;
        self.current
    }

    fn current(&self) -> DocId {
        self.current
    }

    fn get_score(&self, si: &SearchInformation) -> DocumentScore {
        self.operands
            .iter()
            .filter(|op| op.current() == self.current)
            .map(|op| op.get_score(si))
            .sum()
    }
}

/// `left` restricted to ids not matched by `right` (spec §4.7).
pub struct AndNot {
    left: Box<dyn OperatorNode>,
    right: Box<dyn OperatorNode>,
    current: DocId,
}

impl AndNot {
    pub fn new(left: Box<dyn OperatorNode>, right: Box<dyn OperatorNode>) -> Self {
        AndNot { left, right, current: DocId::UNDEFINED }
    }
}

impl OperatorNode for AndNot {
    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.current = DocId::UNDEFINED;
    }

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, is_rough: bool) -> DocId {
        if self.current.is_defined() && id <= self.current {
            return self.current;
        }
        let mut candidate = id;
        loop {
            let got = self.left.lower_bound(si, candidate, is_rough);
            if !got.is_defined() {
                self.current = DocId::UNDEFINED;
                return self.current;
            }
            let excluded = self.right.lower_bound(si, got, is_rough);
            if excluded == got {
                candidate = DocId(got.0 + 1);
                continue;
            }
            self.current = got;
            return self.current;
        }
    }

    fn current(&self) -> DocId {
        self.current
    }

    fn get_score(&self, si: &SearchInformation) -> DocumentScore {
        self.left.get_score(si)
    }
}

/// Disjunction whose operands contribute unevenly weighted scores (spec
/// §4.7), e.g. title matches outweighing body matches.
pub struct WeightedOr {
    operands: Vec<(Box<dyn OperatorNode>, f64)>,
    current: DocId,
}

impl WeightedOr {
    pub fn new(operands: Vec<(Box<dyn OperatorNode>, f64)>) -> Self {
        WeightedOr { operands, current: DocId::UNDEFINED }
    }
}

impl OperatorNode for WeightedOr {
    fn reset(&mut self) {
        for (op, _) in &mut self.operands {
            op.reset();
        }
        self.current = DocId::UNDEFINED;
    }

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, is_rough: bool) -> DocId {
        if self.current.is_defined() && id <= self.current {
            return self.current;
        }
        let mut best = DocId::UNDEFINED;
        for (op, _) in &mut self.operands {
            let got = op.lower_bound(si, id, is_rough);
            if got.is_defined() && (!best.is_defined() || got < best) {
                best = got;
            }
        }
        self.current = best;
        self.current
    }

    fn current(&self) -> DocId {
        self.current
    }

    fn get_score(&self, si: &SearchInformation) -> DocumentScore {
        self.operands
            .iter()
            .filter(|(op, _)| op.current() == self.current)
            .map(|(op, weight)| op.get_score(si) * weight)
            .sum()
    }
}

/// Ordered proximity: terms must occur within `max_gap` positions of each
/// other, in order (SPEC_FULL B.3, `ModInvertedWordOrderedDistanceNode`).
/// Distinct from `NormalLeafNode`'s fixed-relative-position phrase match —
/// here only the *gap* is bounded, not the exact offset.
pub struct Within {
    operands: Vec<Box<dyn LeafNode>>,
    max_gap: u32,
    current: DocId,
    matched: bool,
}

impl Within {
    pub fn new(operands: Vec<Box<dyn LeafNode>>, max_gap: u32) -> Self {
        Within { operands, max_gap, current: DocId::UNDEFINED, matched: false }
    }

    fn verify(&self) -> bool {
        let Some(first) = self.operands.first() else { return false };
        let Some(first_loc) = first.location_list_iterator() else { return false };
        'start: for &start in first_loc.positions() {
            let mut floor = start;
            for op in &self.operands[1..] {
                let Some(loc) = op.location_list_iterator() else { continue 'start };
                let hit = loc.positions().iter().find(|&&p| p > floor && p <= floor + self.max_gap);
                match hit {
                    Some(&p) => floor = p,
                    None => continue 'start,
                }
            }
            return true;
        }
        false
    }
}

impl OperatorNode for Within {
    fn reset(&mut self) {
        for op in &mut self.operands {
            op.reset();
        }
        self.current = DocId::UNDEFINED;
        self.matched = false;
    }

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, is_rough: bool) -> DocId {
        if self.current.is_defined() && id <= self.current {
            return self.current;
        }
        let mut candidate = id;
        loop {
            let mut max_seen = candidate;
            let mut agree = true;
            for op in &mut self.operands {
                let got = op.lower_bound(si, candidate, is_rough);
                if !got.is_defined() {
                    self.current = DocId::UNDEFINED;
                    return self.current;
                }
                if got != candidate {
                    agree = false;
                }
                if got > max_seen {
                    max_seen = got;
                }
            }
            if !agree {
                candidate = max_seen;
                continue;
            }
            if is_rough || self.verify() {
                self.current = candidate;
                self.matched = true;
                return self.current;
            }
            self.matched = false;
            candidate = DocId(candidate.0 + 1);
        }
    }

    fn current(&self) -> DocId {
        self.current
    }

    fn get_score(&self, si: &SearchInformation) -> DocumentScore {
        let tf = self.operands.iter().map(|o| o.term_frequency()).min().unwrap_or(0);
        let df = self.operands.iter().map(|o| o.estimate_count()).min().unwrap_or(0);
        bm25_term_score(si, self.current, tf, df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inverted::iter::TermListIterator;
    use crate::inverted::posting::PostingList;
    use crate::query::leaf::SimpleLeafNode;

    fn leaf(ids: &[u32]) -> Box<dyn OperatorNode> {
        let mut list = PostingList::new();
        for &id in ids {
            list.push(DocId(id), vec![0], 1).unwrap();
        }
        Box::new(OperatorTermNode::new(Box::new(SimpleLeafNode::new(Box::new(TermListIterator::new(list))))))
    }

    #[test]
    fn and_matches_only_ids_present_in_every_operand() {
        let si = SearchInformation::new(10, 5.0);
        let mut node = And::new(vec![leaf(&[1, 3, 5, 7]), leaf(&[3, 5, 9])]);
        assert_eq!(node.lower_bound(&si, DocId(0), true), DocId(3));
        assert_eq!(node.lower_bound(&si, DocId(4), true), DocId(5));
        assert_eq!(node.lower_bound(&si, DocId(6), true), DocId::UNDEFINED);
    }

    #[test]
    fn and_not_excludes_right_operand_matches() {
        let si = SearchInformation::new(10, 5.0);
        let mut node = AndNot::new(leaf(&[1, 3, 5, 7]), leaf(&[3, 7]));
        assert_eq!(node.lower_bound(&si, DocId(0), true), DocId(1));
        assert_eq!(node.lower_bound(&si, DocId(2), true), DocId(5));
    }

    #[test]
    fn or_sums_scores_only_from_agreeing_operands() {
        let si = SearchInformation::new(10, 5.0);
        let mut node = Or::new(vec![leaf(&[1, 5]), leaf(&[5, 9])]);
        assert_eq!(node.lower_bound(&si, DocId(0), true), DocId(1));
        assert_eq!(node.lower_bound(&si, DocId(2), true), DocId(5));
    }
}
