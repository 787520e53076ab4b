//! Per-term document postings (C5, spec §3.1/§6). Grounded on the
//! teacher's `index/posting.rs` (delta/vbyte-encoded postings), extended
//! with the location list spec §3.1 requires: not just a doc-id and a
//! frequency count but every 1-based position the term occurred at plus
//! the token's character length (needed for overlap tests in C6).

use crate::compression::delta::DeltaEncoder;
use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, Result};
use crate::core::types::DocId;

/// Delta-compressed sequence of 1-based positions for one posting, plus the
/// matched token's character length (spec §3.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationList {
    pub positions: Vec<u32>,
    pub token_length: u32,
}

impl LocationList {
    pub fn new(mut positions: Vec<u32>, token_length: u32) -> Self {
        positions.sort_unstable();
        LocationList { positions, token_length }
    }

    pub fn term_frequency(&self) -> u32 {
        self.positions.len() as u32
    }

    /// Encode as `[bit-length(4) · delta-encoded positions · token_length(4)]`
    /// little-endian, per spec §6's inverted list area format. `bit-length`
    /// here records the encoded byte length (the codec is byte-aligned
    /// VByte-over-delta, not a true bit-packed Golomb/Rice stream — see
    /// DESIGN.md).
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = DeltaEncoder::encode_u32_list(&self.positions)?;
        let mut out = Vec::with_capacity(8 + body.len());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out.extend_from_slice(&self.token_length.to_le_bytes());
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < 4 {
            return Err(Error::Parse("location list header truncated".into()));
        }
        let body_len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let body_end = 4 + body_len;
        if bytes.len() < body_end + 4 {
            return Err(Error::Parse("location list body/token-length truncated".into()));
        }
        let positions = DeltaEncoder::decode_u32_list(&bytes[4..body_end])?;
        let token_length = u32::from_le_bytes(bytes[body_end..body_end + 4].try_into().unwrap());
        Ok((LocationList { positions, token_length }, body_end + 4))
    }
}

/// `(doc-id, term-frequency, location-list)` triple for one term in one
/// document (spec GLOSSARY).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub locations: LocationList,
}

impl Posting {
    pub fn term_frequency(&self) -> u32 {
        self.locations.term_frequency()
    }
}

/// An append-only, doc-id-sorted sequence of postings for one term key
/// (spec §3.1). Doc-ids strictly increase (spec §3.2 invariant 9).
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList { postings: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    /// Crate-private escape hatch for segment compaction's merge step
    /// (`inverted::store`), which needs to drain one list's postings into
    /// another without going through the strictly-increasing `push` check.
    pub(crate) fn postings_mut(&mut self) -> &mut Vec<Posting> {
        &mut self.postings
    }

    /// Append one posting, enforcing the strictly-increasing doc-id
    /// invariant (spec §3.2 invariant 9). Appending the same doc-id twice
    /// (re-indexing) is rejected — callers delete-then-reinsert instead,
    /// mirroring the B+tree's update path.
    pub fn push(&mut self, doc_id: DocId, mut positions: Vec<u32>, token_length: u32) -> Result<()> {
        if let Some(last) = self.postings.last() {
            if doc_id <= last.doc_id {
                return Err(Error::BadArgument(format!(
                    "doc id {doc_id:?} is not strictly greater than the last posting {:?}",
                    last.doc_id
                )));
            }
        }
        positions.sort_unstable();
        self.postings.push(Posting {
            doc_id,
            locations: LocationList::new(positions, token_length),
        });
        Ok(())
    }

    /// Encode as `[doc-count(4) · bit-length(4) · delta-encoded doc-ids ·
    /// (per-posting bit-length(4) · delta-encoded positions)...]` per spec
    /// §6, little-endian unconditionally (resolved open question: the
    /// original assumed native endian).
    pub fn encode(&self) -> Result<Vec<u8>> {
        let doc_ids: Vec<u32> = self.postings.iter().map(|p| p.doc_id.0).collect();
        let doc_id_block = DeltaEncoder::encode_u32_list(&doc_ids)?;
        let mut out = Vec::new();
        out.extend_from_slice(&(self.postings.len() as u32).to_le_bytes());
        out.extend_from_slice(&(doc_id_block.len() as u32).to_le_bytes());
        out.extend_from_slice(&doc_id_block);
        for posting in &self.postings {
            out.extend(posting.locations.encode()?);
        }
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 {
            return Err(Error::Parse("posting list header truncated".into()));
        }
        let doc_count = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let doc_id_block_len = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        let mut pos = 8;
        let doc_ids = DeltaEncoder::decode_u32_list(&bytes[pos..pos + doc_id_block_len])?;
        pos += doc_id_block_len;
        if doc_ids.len() != doc_count {
            return Err(Error::Parse("posting list doc-count mismatch".into()));
        }
        let mut postings = Vec::with_capacity(doc_count);
        for doc_id in doc_ids {
            let (locations, consumed) = LocationList::decode(&bytes[pos..])?;
            pos += consumed;
            postings.push(Posting { doc_id: DocId(doc_id), locations });
        }
        Ok(PostingList { postings })
    }

    /// First doc-id ≥ `id`, or `None` if no such posting exists. Used by
    /// both `ListIterator::lower_bound` (C5) and the merge logic in C6/C7.
    pub fn lower_bound_index(&self, id: DocId) -> Option<usize> {
        let idx = self.postings.partition_point(|p| p.doc_id < id);
        if idx < self.postings.len() {
            Some(idx)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posting_list_round_trips_through_encode_decode() {
        let mut list = PostingList::new();
        list.push(DocId(1), vec![0, 6, 12], 5).unwrap();
        list.push(DocId(3), vec![2], 5).unwrap();
        list.push(DocId(9), vec![0, 1, 2], 5).unwrap();
        let bytes = list.encode().unwrap();
        let decoded = PostingList::decode(&bytes).unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded.postings()[0].doc_id, DocId(1));
        assert_eq!(decoded.postings()[0].locations.positions, vec![0, 6, 12]);
        assert_eq!(decoded.postings()[2].term_frequency(), 3);
    }

    #[test]
    fn push_rejects_non_increasing_doc_ids() {
        let mut list = PostingList::new();
        list.push(DocId(5), vec![0], 1).unwrap();
        assert!(list.push(DocId(5), vec![1], 1).is_err());
        assert!(list.push(DocId(4), vec![1], 1).is_err());
    }

    #[test]
    fn lower_bound_index_finds_first_id_not_less_than() {
        let mut list = PostingList::new();
        for id in [2u32, 5, 9, 20] {
            list.push(DocId(id), vec![0], 1).unwrap();
        }
        assert_eq!(list.lower_bound_index(DocId(5)), Some(1));
        assert_eq!(list.lower_bound_index(DocId(6)), Some(2));
        assert_eq!(list.lower_bound_index(DocId(21)), None);
    }
}
