//! Inverted file: a term dictionary plus the posting-list blobs it
//! addresses (spec §3.1/§4.5). Grounded on the teacher's `index/inverted.rs`
//! (`TermDictionary` backed by `fst`) and `storage/segment_writer.rs`'s
//! writer/compacted-segment split: new postings accumulate in an in-memory
//! map (a "live segment"), and `compact` flushes them into an immutable
//! `fst::Map` term dictionary plus a single concatenated postings blob —
//! the same shape the teacher uses for its own segment compaction, just
//! repurposed from documents to postings.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fst::{Map, MapBuilder};

use crate::core::error::{Error, Result};
use crate::core::types::DocId;

use super::iter::{DummyListIterator, ListIterator, TermListIterator};
use super::posting::PostingList;

struct CompactedSegment {
    terms: Map<Vec<u8>>,
    postings: memmap2::Mmap,
}

/// One logical inverted-index file: per-term postings, queryable through
/// `ListIterator` (spec §4.5), with a compaction path that mirrors the
/// teacher's segment writer/reader split.
pub struct InvertedFile {
    dir: PathBuf,
    live: BTreeMap<String, PostingList>,
    compacted: Option<CompactedSegment>,
    last_doc_id: Option<DocId>,
}

impl InvertedFile {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(InvertedFile {
            dir,
            live: BTreeMap::new(),
            compacted: None,
            last_doc_id: None,
        })
    }

    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let terms_path = dir.join("terms.fst");
        let compacted = if terms_path.exists() {
            let terms_bytes = std::fs::read(&terms_path)?;
            let terms = Map::new(terms_bytes).map_err(Error::from)?;
            let postings_file = File::open(dir.join("postings.bin"))?;
            let postings = unsafe { memmap2::Mmap::map(&postings_file)? };
            Some(CompactedSegment { terms, postings })
        } else {
            None
        };
        Ok(InvertedFile {
            dir,
            live: BTreeMap::new(),
            compacted,
            last_doc_id: None,
        })
    }

    /// Index one document's tokenized form: `(position, term, length)`
    /// tuples as the external tokenizer boundary produces them (spec §1).
    /// Doc-ids must be indexed in strictly increasing order across the
    /// live segment's lifetime (spec §3.2 invariant 9); callers that need
    /// out-of-order indexing must `compact` between runs.
    pub fn index_document(&mut self, doc_id: DocId, tokens: &[(u32, String, u32)]) -> Result<()> {
        if let Some(last) = self.last_doc_id {
            if doc_id <= last {
                return Err(Error::BadArgument(format!(
                    "doc id {doc_id:?} is not strictly greater than the last indexed {last:?}"
                )));
            }
        }
        let mut per_term: BTreeMap<&str, (Vec<u32>, u32)> = BTreeMap::new();
        for (position, term, length) in tokens {
            let entry = per_term.entry(term.as_str()).or_insert_with(|| (Vec::new(), *length));
            entry.0.push(*position);
        }
        for (term, (positions, length)) in per_term {
            self.live
                .entry(term.to_string())
                .or_insert_with(PostingList::new)
                .push(doc_id, positions, length)?;
        }
        self.last_doc_id = Some(doc_id);
        Ok(())
    }

    fn compacted_list(&self, term: &str) -> Result<Option<PostingList>> {
        let Some(seg) = &self.compacted else { return Ok(None) };
        let Some(offset) = seg.terms.get(term) else { return Ok(None) };
        let offset = offset as usize;
        if offset + 4 > seg.postings.len() {
            return Err(Error::PageCorrupt("inverted postings offset out of range".into()));
        }
        let len = u32::from_le_bytes(seg.postings[offset..offset + 4].try_into().unwrap()) as usize;
        let body = &seg.postings[offset + 4..offset + 4 + len];
        Ok(Some(PostingList::decode(body)?))
    }

    /// Return a scan cursor over `term`'s postings, merging the live
    /// segment with the compacted one when both hold postings for it
    /// (spec §4.5/§4.6 treat this as one logical list regardless of where
    /// it physically lives).
    pub fn list_iterator(&self, term: &str) -> Result<Box<dyn ListIterator>> {
        let live = self.live.get(term).cloned();
        let compacted = self.compacted_list(term)?;
        match (live, compacted) {
            (None, None) => Ok(Box::new(DummyListIterator)),
            (Some(list), None) | (None, Some(list)) => Ok(Box::new(TermListIterator::new(list))),
            (Some(mut live), Some(compacted)) => {
                let mut merged = compacted;
                for posting in live.postings_mut().drain(..) {
                    merged.push_posting(posting)?;
                }
                Ok(Box::new(TermListIterator::new(merged)))
            }
        }
    }

    pub fn document_frequency(&self, term: &str) -> Result<u32> {
        Ok(self.list_iterator(term)?.estimate_count())
    }

    pub fn term_count(&self) -> usize {
        let compacted = self.compacted.as_ref().map(|s| s.terms.len()).unwrap_or(0);
        self.live.keys().filter(|t| !self.compacted_has(t)).count() + compacted
    }

    fn compacted_has(&self, term: &str) -> bool {
        self.compacted.as_ref().map(|s| s.terms.get(term).is_some()).unwrap_or(false)
    }

    /// Flush the live segment into an immutable `fst::Map` term dictionary
    /// plus a concatenated postings blob, merging with any previously
    /// compacted segment (teacher's segment-merge idiom, `storage/
    /// merge_policy.rs`, repurposed here for one inverted file instead of
    /// tiered segments).
    pub fn compact(&mut self) -> Result<()> {
        if self.live.is_empty() && self.compacted.is_some() {
            return Ok(());
        }
        let mut merged: BTreeMap<String, PostingList> = BTreeMap::new();
        if let Some(seg) = &self.compacted {
            for term in seg.terms.stream().into_str_vec().map_err(Error::from)? {
                let (term, _) = term;
                if let Some(list) = self.compacted_list(&term)? {
                    merged.insert(term, list);
                }
            }
        }
        for (term, list) in std::mem::take(&mut self.live) {
            merged
                .entry(term)
                .and_modify(|existing| existing.extend(&list))
                .or_insert(list);
        }

        let postings_path = self.dir.join("postings.bin.new");
        let terms_path = self.dir.join("terms.fst.new");
        {
            let mut writer = BufWriter::new(File::create(&postings_path)?);
            let mut builder = MapBuilder::new(BufWriter::new(File::create(&terms_path)?)).map_err(Error::from)?;
            let mut offset: u64 = 0;
            for (term, list) in &merged {
                let body = list.encode()?;
                writer.write_all(&(body.len() as u32).to_le_bytes())?;
                writer.write_all(&body)?;
                builder.insert(term, offset).map_err(Error::from)?;
                offset += 4 + body.len() as u64;
            }
            builder.finish().map_err(Error::from)?;
            writer.flush()?;
        }
        std::fs::rename(&postings_path, self.dir.join("postings.bin"))?;
        std::fs::rename(&terms_path, self.dir.join("terms.fst"))?;

        let terms_bytes = std::fs::read(self.dir.join("terms.fst"))?;
        let terms = Map::new(terms_bytes).map_err(Error::from)?;
        let postings_file = File::open(self.dir.join("postings.bin"))?;
        let postings = unsafe { memmap2::Mmap::map(&postings_file)? };
        self.compacted = Some(CompactedSegment { terms, postings });
        self.live.clear();
        Ok(())
    }
}

impl PostingList {
    /// Used only by compaction's merge step: append an already-built
    /// posting onto a list assembled from another segment, re-validating
    /// the strictly-increasing doc-id invariant across the merge boundary.
    pub(crate) fn push_posting(&mut self, posting: super::posting::Posting) -> Result<()> {
        self.push(posting.doc_id, posting.locations.positions, posting.locations.token_length)
    }

    /// Merge another (doc-id-sorted) list's postings into this one.
    pub(crate) fn extend(&mut self, other: &PostingList) {
        for p in other.postings() {
            let _ = self.push(p.doc_id, p.locations.positions.clone(), p.locations.token_length);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_query_before_compaction() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = InvertedFile::create(dir.path()).unwrap();
        file.index_document(DocId(0), &[(0, "quick".into(), 5), (1, "brown".into(), 5), (2, "fox".into(), 3)])
            .unwrap();
        file.index_document(DocId(1), &[(0, "brown".into(), 5), (1, "fox".into(), 3)]).unwrap();
        assert_eq!(file.document_frequency("brown").unwrap(), 2);
        assert_eq!(file.document_frequency("missing").unwrap(), 0);
    }

    #[test]
    fn compaction_preserves_postings_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut file = InvertedFile::create(dir.path()).unwrap();
            file.index_document(DocId(0), &[(0, "quick".into(), 5)]).unwrap();
            file.index_document(DocId(1), &[(0, "quick".into(), 5)]).unwrap();
            file.compact().unwrap();
        }
        let reopened = InvertedFile::open(dir.path()).unwrap();
        assert_eq!(reopened.document_frequency("quick").unwrap(), 2);
    }
}
