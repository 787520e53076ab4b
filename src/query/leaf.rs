//! LeafNode tree (C6, spec §4.6). Each `LeafNode` evaluates a single "term"
//! expression over positions; the variants differ only in how a document
//! match is decided and what position list gets reported for scoring/KWIC.
//! Grounded on the teacher's `search/fuzzy.rs`/`query/matcher.rs` dispatch
//! idiom (a trait plus a small set of concrete matchers) and, for the
//! pooled location iterators, the same module's scratch-buffer reuse
//! pattern.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::core::types::DocId;
use crate::inverted::iter::{ListIterator, LocationListIterator};
use crate::search::info::SearchInformation;

/// Free-list of position buffers a LeafNode hands out and reclaims (spec
/// §4.6.2). Pools the `Vec<u32>` backing store rather than whole iterator
/// objects — that vector is the only part of a `LocationListIterator`
/// actually worth not reallocating on every matched document.
#[derive(Debug, Default)]
pub struct LocationListManager {
    free: Vec<Vec<u32>>,
}

impl LocationListManager {
    pub fn new() -> Self {
        LocationListManager::default()
    }

    fn checkout(&mut self) -> Vec<u32> {
        match self.free.pop() {
            Some(mut buf) => {
                buf.clear();
                buf
            }
            None => Vec::new(),
        }
    }

    fn release(&mut self, buf: Vec<u32>) {
        self.free.push(buf);
    }
}

/// RAII handle standing in for the original's `AutoPointer<LocationListIterator>`:
/// the wrapped iterator's buffer returns to its pool on drop instead of
/// requiring every caller to remember an explicit `release()`.
pub struct PooledLocationListIterator {
    inner: Option<LocationListIterator>,
    pool: Rc<RefCell<LocationListManager>>,
}

impl Deref for PooledLocationListIterator {
    type Target = LocationListIterator;
    fn deref(&self) -> &LocationListIterator {
        self.inner.as_ref().expect("accessed after drop")
    }
}

impl DerefMut for PooledLocationListIterator {
    fn deref_mut(&mut self) -> &mut LocationListIterator {
        self.inner.as_mut().expect("accessed after drop")
    }
}

impl Drop for PooledLocationListIterator {
    fn drop(&mut self) {
        if let Some(it) = self.inner.take() {
            let (positions, _) = it.into_parts();
            self.pool.borrow_mut().release(positions);
        }
    }
}

fn wrap(pool: &Rc<RefCell<LocationListManager>>, positions: Vec<u32>, token_length: u32) -> PooledLocationListIterator {
    PooledLocationListIterator {
        inner: Some(LocationListIterator::from_parts(positions, token_length)),
        pool: pool.clone(),
    }
}

/// Shared contract for every leaf-level term expression (spec §4.6).
pub trait LeafNode {
    fn reset(&mut self);

    /// If `id <= current`, return `current` unchanged — unlike
    /// `ListIterator::lower_bound`, which always seeks (spec §4.6's core
    /// contract, explicitly called out as the one place the two contracts
    /// differ).
    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, is_rough: bool) -> DocId;

    fn current(&self) -> DocId;

    fn term_frequency(&self) -> u32;

    fn estimate_count(&self) -> u32;

    fn location_list_iterator(&self) -> Option<PooledLocationListIterator>;
}

/// One indexed token (spec §4.6 table).
pub struct SimpleLeafNode {
    list: Box<dyn ListIterator>,
    pool: Rc<RefCell<LocationListManager>>,
    current: DocId,
}

impl SimpleLeafNode {
    pub fn new(list: Box<dyn ListIterator>) -> Self {
        SimpleLeafNode {
            list,
            pool: Rc::new(RefCell::new(LocationListManager::new())),
            current: DocId::UNDEFINED,
        }
    }
}

impl LeafNode for SimpleLeafNode {
    fn reset(&mut self) {
        self.list.reset();
        self.current = DocId::UNDEFINED;
    }

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, _is_rough: bool) -> DocId {
        if self.current.is_defined() && id <= self.current {
            return self.current;
        }
        self.current = self.list.lower_bound(si, id).unwrap_or(DocId::UNDEFINED);
        self.current
    }

    fn current(&self) -> DocId {
        self.current
    }

    fn term_frequency(&self) -> u32 {
        self.list.term_frequency()
    }

    fn estimate_count(&self) -> u32 {
        self.list.estimate_count()
    }

    fn location_list_iterator(&self) -> Option<PooledLocationListIterator> {
        let fresh = self.list.location_list_iterator()?;
        let (positions, token_length) = fresh.into_parts();
        Some(wrap(&self.pool, positions, token_length))
    }
}

/// One selected token in a phrase (spec §4.6.1).
struct PhraseTerm {
    iter: Box<dyn ListIterator>,
    relative_position: i32,
}

/// N tokens at known relative positions forming one phrase (spec §4.6
/// table). Construction picks a near-optimal non-overlapping subset per
/// §4.6.1 rather than requiring every token to be verified.
pub struct NormalLeafNode {
    terms: Vec<PhraseTerm>,
    rarest_index: usize,
    pool: Rc<RefCell<LocationListManager>>,
    current: DocId,
    matched_base: Vec<u32>,
}

impl NormalLeafNode {
    /// `candidates` is the phrase's full tokenized form as `(relative
    /// position, postings)` pairs; this picks the subset per §4.6.1:
    /// always include the rarest token, then greedily add the closest
    /// non-overlapping neighbors on each side.
    pub fn build(mut candidates: Vec<(i32, Box<dyn ListIterator>)>) -> Self {
        candidates.sort_by_key(|(rel, _)| *rel);
        let n = candidates.len();
        let pool = Rc::new(RefCell::new(LocationListManager::new()));
        if n == 0 {
            return NormalLeafNode {
                terms: Vec::new(),
                rarest_index: 0,
                pool,
                current: DocId::UNDEFINED,
                matched_base: Vec::new(),
            };
        }

        let rarest = (0..n)
            .min_by_key(|&i| candidates[i].1.estimate_count())
            .unwrap();
        let mut selected = vec![false; n];
        selected[rarest] = true;

        let mut bound = candidates[rarest].0;
        for i in (0..rarest).rev() {
            let end = candidates[i].0 + candidates[i].1.length() as i32;
            if end <= bound {
                selected[i] = true;
                bound = candidates[i].0;
            }
        }
        let mut bound = candidates[rarest].0 + candidates[rarest].1.length() as i32;
        for (i, candidate) in candidates.iter().enumerate().skip(rarest + 1) {
            if candidate.0 >= bound {
                selected[i] = true;
                bound = candidate.0 + candidate.1.length() as i32;
            }
        }

        let mut slots: Vec<Option<(i32, Box<dyn ListIterator>)>> = candidates.into_iter().map(Some).collect();
        let mut terms = Vec::new();
        let mut new_rarest_index = 0;
        for (i, keep) in selected.into_iter().enumerate() {
            if keep {
                let (relative_position, iter) = slots[i].take().unwrap();
                if i == rarest {
                    new_rarest_index = terms.len();
                }
                terms.push(PhraseTerm { iter, relative_position });
            }
        }

        NormalLeafNode {
            terms,
            rarest_index: new_rarest_index,
            pool,
            current: DocId::UNDEFINED,
            matched_base: Vec::new(),
        }
    }

    fn verify_phrase(&self) -> Option<Vec<u32>> {
        if self.terms.len() <= 1 {
            let loc = self.terms.first()?.iter.location_list_iterator()?;
            return Some(loc.positions().to_vec());
        }
        let rarest = &self.terms[self.rarest_index];
        let rarest_loc = rarest.iter.location_list_iterator()?;
        let mut bases = Vec::new();
        'base: for &abs in rarest_loc.positions() {
            let pos = abs as i64 - rarest.relative_position as i64;
            if pos < 0 {
                continue;
            }
            for (j, term) in self.terms.iter().enumerate() {
                if j == self.rarest_index {
                    continue;
                }
                let want = pos + term.relative_position as i64;
                if want < 0 {
                    continue 'base;
                }
                let matches = term
                    .iter
                    .location_list_iterator()
                    .map(|l| l.contains(want as u32))
                    .unwrap_or(false);
                if !matches {
                    continue 'base;
                }
            }
            bases.push(pos as u32);
        }
        if bases.is_empty() {
            None
        } else {
            Some(bases)
        }
    }
}

impl LeafNode for NormalLeafNode {
    fn reset(&mut self) {
        for term in &mut self.terms {
            term.iter.reset();
        }
        self.current = DocId::UNDEFINED;
        self.matched_base.clear();
    }

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, is_rough: bool) -> DocId {
        if self.current.is_defined() && id <= self.current {
            return self.current;
        }
        if self.terms.is_empty() {
            self.current = DocId::UNDEFINED;
            return self.current;
        }
        let mut candidate = id;
        loop {
            let mut max_seen = candidate;
            let mut agree = true;
            for term in &mut self.terms {
                match term.iter.lower_bound(si, candidate) {
                    Some(got) => {
                        if got != candidate {
                            agree = false;
                        }
                        if got > max_seen {
                            max_seen = got;
                        }
                    }
                    None => {
                        self.current = DocId::UNDEFINED;
                        return self.current;
                    }
                }
            }
            if !agree {
                candidate = max_seen;
                continue;
            }
            if is_rough {
                self.current = candidate;
                self.matched_base.clear();
                return self.current;
            }
            match self.verify_phrase() {
                Some(bases) => {
                    self.current = candidate;
                    self.matched_base = bases;
                    return self.current;
                }
                None => {
                    candidate = DocId(candidate.0 + 1);
                }
            }
        }
    }

    fn current(&self) -> DocId {
        self.current
    }

    fn term_frequency(&self) -> u32 {
        self.matched_base.len() as u32
    }

    fn estimate_count(&self) -> u32 {
        self.terms.iter().map(|t| t.iter.estimate_count()).min().unwrap_or(0)
    }

    fn location_list_iterator(&self) -> Option<PooledLocationListIterator> {
        if self.matched_base.is_empty() {
            return None;
        }
        let mut buf = self.pool.borrow_mut().checkout();
        buf.extend_from_slice(&self.matched_base);
        let first = self.terms.first()?;
        let last = self.terms.last()?;
        let span = (last.relative_position + last.iter.length() as i32 - first.relative_position).max(0) as u32;
        Some(wrap(&self.pool, buf, span))
    }
}

/// A query shorter than the minimum index unit, expanded to every indexed
/// token starting with it (spec §4.6 table). Matching is a doc-at-a-time OR
/// across the alternatives; reported positions are the union, de-duplicated
/// to avoid double-counting overlapping expansions (the
/// "ShortLeafLocationListIterator" behavior spec §4.6 names).
pub struct ShortLeafNode {
    alternatives: Vec<Box<dyn ListIterator>>,
    pool: Rc<RefCell<LocationListManager>>,
    current: DocId,
}

impl ShortLeafNode {
    pub fn new(alternatives: Vec<Box<dyn ListIterator>>) -> Self {
        ShortLeafNode {
            alternatives,
            pool: Rc::new(RefCell::new(LocationListManager::new())),
            current: DocId::UNDEFINED,
        }
    }
}

impl LeafNode for ShortLeafNode {
    fn reset(&mut self) {
        for alt in &mut self.alternatives {
            alt.reset();
        }
        self.current = DocId::UNDEFINED;
    }

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, _is_rough: bool) -> DocId {
        if self.current.is_defined() && id <= self.current {
            return self.current;
        }
        let mut best: Option<DocId> = None;
        for alt in &mut self.alternatives {
            if let Some(got) = alt.lower_bound(si, id) {
                best = Some(best.map_or(got, |b| b.min(got)));
            }
        }
        self.current = best.unwrap_or(DocId::UNDEFINED);
        self.current
    }

    fn current(&self) -> DocId {
        self.current
    }

    fn term_frequency(&self) -> u32 {
        let mut positions = self.union_positions();
        positions.sort_unstable();
        positions.dedup();
        positions.len() as u32
    }

    fn estimate_count(&self) -> u32 {
        self.alternatives.iter().map(|a| a.estimate_count()).sum()
    }

    fn location_list_iterator(&self) -> Option<PooledLocationListIterator> {
        if !self.current.is_defined() {
            return None;
        }
        let mut buf = self.pool.borrow_mut().checkout();
        let mut token_length = 0;
        for alt in &self.alternatives {
            if alt.current() == Some(self.current) {
                if let Some(loc) = alt.location_list_iterator() {
                    buf.extend_from_slice(loc.positions());
                    token_length = token_length.max(loc.token_length());
                }
            }
        }
        buf.sort_unstable();
        buf.dedup();
        Some(wrap(&self.pool, buf, token_length))
    }
}

impl ShortLeafNode {
    fn union_positions(&self) -> Vec<u32> {
        let mut positions = Vec::new();
        for alt in &self.alternatives {
            if alt.current() == Some(self.current) {
                if let Some(loc) = alt.location_list_iterator() {
                    positions.extend_from_slice(loc.positions());
                }
            }
        }
        positions
    }
}

/// Reproduces an older implementation's quirk: positions are reported from
/// only the first matching alternative, unmerged and undeduplicated.
/// Reference-only — new installs use [`ShortLeafNode`].
pub struct ShortLeafNodeCompatible {
    inner: ShortLeafNode,
}

impl ShortLeafNodeCompatible {
    pub fn new(alternatives: Vec<Box<dyn ListIterator>>) -> Self {
        ShortLeafNodeCompatible { inner: ShortLeafNode::new(alternatives) }
    }
}

impl LeafNode for ShortLeafNodeCompatible {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, is_rough: bool) -> DocId {
        self.inner.lower_bound(si, id, is_rough)
    }

    fn current(&self) -> DocId {
        self.inner.current
    }

    fn term_frequency(&self) -> u32 {
        self.inner
            .alternatives
            .iter()
            .find(|a| a.current() == Some(self.inner.current))
            .map(|a| a.term_frequency())
            .unwrap_or(0)
    }

    fn estimate_count(&self) -> u32 {
        self.inner.estimate_count()
    }

    fn location_list_iterator(&self) -> Option<PooledLocationListIterator> {
        if !self.inner.current.is_defined() {
            return None;
        }
        for alt in &self.inner.alternatives {
            if alt.current() == Some(self.inner.current) {
                if let Some(loc) = alt.location_list_iterator() {
                    let mut buf = self.inner.pool.borrow_mut().checkout();
                    buf.extend_from_slice(loc.positions());
                    return Some(wrap(&self.inner.pool, buf, loc.token_length()));
                }
            }
        }
        None
    }
}

/// A phrase part joined with a short-word suffix at a fixed offset (spec
/// §4.6 table): matches only where both halves match the same document;
/// reported positions are the normal phrase's positions plus the short
/// part's positions shifted by `offset`.
pub struct NormalShortLeafNode {
    normal: NormalLeafNode,
    short: ShortLeafNode,
    offset: i32,
    pool: Rc<RefCell<LocationListManager>>,
    current: DocId,
}

impl NormalShortLeafNode {
    pub fn new(normal: NormalLeafNode, short: ShortLeafNode, offset: i32) -> Self {
        NormalShortLeafNode {
            normal,
            short,
            offset,
            pool: Rc::new(RefCell::new(LocationListManager::new())),
            current: DocId::UNDEFINED,
        }
    }
}

impl LeafNode for NormalShortLeafNode {
    fn reset(&mut self) {
        self.normal.reset();
        self.short.reset();
        self.current = DocId::UNDEFINED;
    }

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, is_rough: bool) -> DocId {
        if self.current.is_defined() && id <= self.current {
            return self.current;
        }
        let mut candidate = id;
        loop {
            let a = self.normal.lower_bound(si, candidate, is_rough);
            let b = self.short.lower_bound(si, candidate, is_rough);
            if !a.is_defined() || !b.is_defined() {
                self.current = DocId::UNDEFINED;
                return self.current;
            }
            if a == b {
                self.current = a;
                return self.current;
            }
            candidate = a.max(b);
        }
    }

    fn current(&self) -> DocId {
        self.current
    }

    fn term_frequency(&self) -> u32 {
        // Approximate: sum of the two halves' frequencies rather than a
        // true de-duplicated merge (the merged position list is only
        // materialized lazily, in `location_list_iterator`).
        self.normal.term_frequency() + self.short.term_frequency()
    }

    fn estimate_count(&self) -> u32 {
        self.normal.estimate_count().min(self.short.estimate_count())
    }

    fn location_list_iterator(&self) -> Option<PooledLocationListIterator> {
        let normal_loc = self.normal.location_list_iterator();
        let short_loc = self.short.location_list_iterator();
        if normal_loc.is_none() && short_loc.is_none() {
            return None;
        }
        let mut buf = self.pool.borrow_mut().checkout();
        let mut token_length = 0;
        if let Some(n) = &normal_loc {
            buf.extend_from_slice(n.positions());
            token_length = token_length.max(n.token_length());
        }
        if let Some(s) = &short_loc {
            buf.extend(s.positions().iter().map(|p| (*p as i32 + self.offset).max(0) as u32));
            token_length = token_length.max(s.token_length());
        }
        buf.sort_unstable();
        buf.dedup();
        Some(wrap(&self.pool, buf, token_length))
    }
}

/// A disjunction treated as a single scoring atom (spec §4.6 table):
/// position is the union of positions from every alternative that hits the
/// matched doc (deduplicated — summing would double-count overlapping
/// expansions, spec SPEC_FULL B.7).
pub struct AtomicOrLeafNode {
    alternatives: Vec<Box<dyn LeafNode>>,
    pool: Rc<RefCell<LocationListManager>>,
    current: DocId,
}

impl AtomicOrLeafNode {
    pub fn new(alternatives: Vec<Box<dyn LeafNode>>) -> Self {
        AtomicOrLeafNode {
            alternatives,
            pool: Rc::new(RefCell::new(LocationListManager::new())),
            current: DocId::UNDEFINED,
        }
    }
}

impl LeafNode for AtomicOrLeafNode {
    fn reset(&mut self) {
        for alt in &mut self.alternatives {
            alt.reset();
        }
        self.current = DocId::UNDEFINED;
    }

    fn lower_bound(&mut self, si: &SearchInformation, id: DocId, is_rough: bool) -> DocId {
        if self.current.is_defined() && id <= self.current {
            return self.current;
        }
        let mut best = DocId::UNDEFINED;
        for alt in &mut self.alternatives {
            let got = alt.lower_bound(si, id, is_rough);
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

    fn term_frequency(&self) -> u32 {
        let mut positions = self.union_positions();
        positions.sort_unstable();
        positions.dedup();
        positions.len() as u32
    }

    fn estimate_count(&self) -> u32 {
        self.alternatives.iter().map(|a| a.estimate_count()).sum()
    }

    fn location_list_iterator(&self) -> Option<PooledLocationListIterator> {
        if !self.current.is_defined() {
            return None;
        }
        let mut buf = self.pool.borrow_mut().checkout();
        let mut token_length = 0;
        for alt in &self.alternatives {
            if alt.current() == self.current {
                if let Some(loc) = alt.location_list_iterator() {
                    buf.extend_from_slice(loc.positions());
                    token_length = token_length.max(loc.token_length());
                }
            }
        }
        buf.sort_unstable();
        buf.dedup();
        Some(wrap(&self.pool, buf, token_length))
    }
}

impl AtomicOrLeafNode {
    fn union_positions(&self) -> Vec<u32> {
        let mut positions = Vec::new();
        for alt in &self.alternatives {
            if alt.current() == self.current {
                if let Some(loc) = alt.location_list_iterator() {
                    positions.extend_from_slice(loc.positions());
                }
            }
        }
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inverted::iter::TermListIterator;
    use crate::inverted::posting::PostingList;

    fn postings(ids: &[u32]) -> PostingList {
        let mut list = PostingList::new();
        for &id in ids {
            list.push(DocId(id), vec![0], 1).unwrap();
        }
        list
    }

    fn postings_with_positions(entries: &[(u32, &[u32])]) -> PostingList {
        let mut list = PostingList::new();
        for &(id, positions) in entries {
            list.push(DocId(id), positions.to_vec(), 1).unwrap();
        }
        list
    }

    #[test]
    fn simple_leaf_node_holds_position_on_smaller_seek() {
        let si = SearchInformation::new(0, 0.0);
        let mut node = SimpleLeafNode::new(Box::new(TermListIterator::new(postings(&[2, 5, 9]))));
        assert_eq!(node.lower_bound(&si, DocId(6), false), DocId(9));
        // Unlike ListIterator::lower_bound, a smaller id leaves current unchanged.
        assert_eq!(node.lower_bound(&si, DocId(0), false), DocId(9));
    }

    #[test]
    fn normal_leaf_node_matches_only_aligned_phrase_occurrences() {
        let si = SearchInformation::new(0, 0.0);
        // doc 1: "the" at 0, "fox" at 2 -> aligned for relative offsets (0, 2).
        // doc 2: "the" at 0, "fox" at 5 -> not aligned.
        let the = postings_with_positions(&[(1, &[0]), (2, &[0])]);
        let fox = postings_with_positions(&[(1, &[2]), (2, &[5])]);
        let mut node = NormalLeafNode::build(vec![
            (0, Box::new(TermListIterator::new(the))),
            (2, Box::new(TermListIterator::new(fox))),
        ]);
        assert_eq!(node.lower_bound(&si, DocId(0), false), DocId(1));
        assert_eq!(node.term_frequency(), 1);
        assert_eq!(node.lower_bound(&si, DocId(2), false), DocId::UNDEFINED);
    }

    #[test]
    fn short_leaf_node_unions_alternatives_without_double_counting_overlap() {
        let si = SearchInformation::new(0, 0.0);
        let cat = postings_with_positions(&[(1, &[3])]);
        let cats = postings_with_positions(&[(1, &[3])]);
        let mut node = ShortLeafNode::new(vec![
            Box::new(TermListIterator::new(cat)),
            Box::new(TermListIterator::new(cats)),
        ]);
        assert_eq!(node.lower_bound(&si, DocId(0), true), DocId(1));
        assert_eq!(node.term_frequency(), 1);
    }

    #[test]
    fn atomic_or_leaf_node_matches_smallest_doc_across_alternatives() {
        let si = SearchInformation::new(0, 0.0);
        let a: Box<dyn LeafNode> = Box::new(SimpleLeafNode::new(Box::new(TermListIterator::new(postings(&[4, 8])))));
        let b: Box<dyn LeafNode> = Box::new(SimpleLeafNode::new(Box::new(TermListIterator::new(postings(&[1, 9])))));
        let mut node = AtomicOrLeafNode::new(vec![a, b]);
        assert_eq!(node.lower_bound(&si, DocId(0), true), DocId(1));
        assert_eq!(node.lower_bound(&si, DocId(2), true), DocId(4));
    }
}
