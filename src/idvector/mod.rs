//! ROWID↔DocID vector (C10, spec §3.1/§4.10). Two independent,
//! direct-addressed paged files — confirmed by `original_source/
//! IDVectorFile.h` to be separate structures rather than one bidirectional
//! one (SPEC_FULL B.5) — giving O(1) lookup (one page fix) in either
//! direction. Grounded on the teacher's `storage/segment_writer.rs`/
//! `segment_reader.rs` paged read/write idiom, restated as fixed-slot
//! (not length-prefixed) records.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::core::error::Result;
use crate::core::types::{DocId, RowId};

/// Page 0 is reserved (spec §3.1: "the entry for key *k* lives at page
/// `⌊k/N⌋+1`" — pages are 1-indexed, leaving page 0 free for a future
/// header without reshuffling existing entries).
const RESERVED_PAGES: u64 = 1;

/// A flat, direct-addressed paged vector mapping a dense 32-bit key to a
/// fixed-width record. `entry_size` is 4 bytes for `DocId` values, 8 for
/// `RowId` (this crate's `RowId` is 64-bit, wider than the spec's generic
/// "32-bit vector" — the addressing formula is unchanged, just scaled by
/// the wider slot).
struct PagedVector {
    file: File,
    path: PathBuf,
    page_size: usize,
    entry_size: usize,
    entries_per_page: usize,
}

impl PagedVector {
    fn create(path: impl AsRef<Path>, page_size: usize, entry_size: usize) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).create(true).truncate(true).open(&path)?;
        Ok(PagedVector {
            file,
            path: path.as_ref().to_path_buf(),
            page_size,
            entry_size,
            entries_per_page: (page_size / entry_size).max(1),
        })
    }

    fn open(path: impl AsRef<Path>, page_size: usize, entry_size: usize) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(PagedVector {
            file,
            path: path.as_ref().to_path_buf(),
            page_size,
            entry_size,
            entries_per_page: (page_size / entry_size).max(1),
        })
    }

    /// Byte offset of key `k`'s slot: page `⌊k/N⌋+1`, offset `(k mod N)*entry_size`
    /// within that page (spec §3.1).
    fn offset(&self, key: u32) -> u64 {
        let n = self.entries_per_page as u64;
        let page = key as u64 / n + RESERVED_PAGES;
        let in_page = (key as u64 % n) * self.entry_size as u64;
        page * self.page_size as u64 + in_page
    }

    fn read_slot(&mut self, key: u32) -> Result<Option<Vec<u8>>> {
        let offset = self.offset(key);
        let len = self.file.metadata()?.len();
        if offset + self.entry_size as u64 > len {
            return Ok(None);
        }
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; self.entry_size];
        self.file.read_exact(&mut buf)?;
        Ok(Some(buf))
    }

    fn write_slot(&mut self, key: u32, bytes: &[u8]) -> Result<()> {
        debug_assert_eq!(bytes.len(), self.entry_size);
        let offset = self.offset(key);
        let len = self.file.metadata()?.len();
        if offset + self.entry_size as u64 > len {
            // `set_len` zero-fills the new region, but the "unmapped"
            // sentinel is all-`0xff` (`DocId`/`RowId::UNDEFINED`), not
            // zero. Sentinel-fill the gap between the old end of file and
            // this slot before growing, so every never-written slot reads
            // back as undefined instead of as key 0.
            self.file.set_len(offset)?;
            self.fill_with_sentinel(len, offset)?;
        }
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    fn fill_with_sentinel(&mut self, from: u64, to: u64) -> Result<()> {
        if from >= to {
            return Ok(());
        }
        self.file.set_len(to)?;
        self.file.seek(SeekFrom::Start(from))?;
        let chunk = vec![0xffu8; self.page_size.max(self.entry_size)];
        let mut remaining = to - from;
        while remaining > 0 {
            let n = remaining.min(chunk.len() as u64) as usize;
            self.file.write_all(&chunk[..n])?;
            remaining -= n as u64;
        }
        Ok(())
    }

    fn page_count(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len() / self.page_size as u64)
    }

    /// All `(key, slot_bytes)` pairs whose slot is not all-`0xff` (the
    /// "unmapped" sentinel), across every page in the file.
    fn live_entries(&mut self) -> Result<Vec<(u32, Vec<u8>)>> {
        let pages = self.page_count()?;
        let mut out = Vec::new();
        for page in RESERVED_PAGES..pages {
            let base_key = (page - RESERVED_PAGES) as u32 * self.entries_per_page as u32;
            for slot in 0..self.entries_per_page as u32 {
                let key = base_key + slot;
                if let Some(bytes) = self.read_slot(key)? {
                    if bytes.iter().any(|&b| b != 0xff) {
                        out.push((key, bytes));
                    }
                }
            }
        }
        Ok(out)
    }
}

/// `rowid → doc-id`, 4-byte slots keyed by `RowId` truncated to its low 32
/// bits (this crate's internal doc-id space is itself 32-bit, so a row
/// vector never needs more than `u32::MAX` live rows per file).
pub struct RowIdToDocIdVector {
    inner: PagedVector,
}

impl RowIdToDocIdVector {
    pub fn create(path: impl AsRef<Path>, page_size: usize) -> Result<Self> {
        Ok(RowIdToDocIdVector { inner: PagedVector::create(path, page_size, 4)? })
    }

    pub fn open(path: impl AsRef<Path>, page_size: usize) -> Result<Self> {
        Ok(RowIdToDocIdVector { inner: PagedVector::open(path, page_size, 4)? })
    }

    fn key(row_id: RowId) -> u32 {
        row_id.0 as u32
    }

    pub fn get(&mut self, row_id: RowId) -> Result<Option<DocId>> {
        let slot = self.inner.read_slot(Self::key(row_id))?;
        Ok(slot.map(|b| DocId(u32::from_le_bytes(b.try_into().unwrap()))).filter(|d| d.is_defined()))
    }

    pub fn set(&mut self, row_id: RowId, doc_id: DocId) -> Result<()> {
        self.inner.write_slot(Self::key(row_id), &doc_id.0.to_le_bytes())
    }

    pub fn remove(&mut self, row_id: RowId) -> Result<()> {
        self.inner.write_slot(Self::key(row_id), &DocId::UNDEFINED.0.to_le_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

/// `doc-id → rowid`, 8-byte slots keyed by `DocId`.
pub struct DocIdToRowIdVector {
    inner: PagedVector,
}

impl DocIdToRowIdVector {
    pub fn create(path: impl AsRef<Path>, page_size: usize) -> Result<Self> {
        Ok(DocIdToRowIdVector { inner: PagedVector::create(path, page_size, 8)? })
    }

    pub fn open(path: impl AsRef<Path>, page_size: usize) -> Result<Self> {
        Ok(DocIdToRowIdVector { inner: PagedVector::open(path, page_size, 8)? })
    }

    pub fn get(&mut self, doc_id: DocId) -> Result<Option<RowId>> {
        let slot = self.inner.read_slot(doc_id.0)?;
        Ok(slot.map(|b| RowId(u64::from_le_bytes(b.try_into().unwrap()))).filter(|r| r.is_defined()))
    }

    pub fn set(&mut self, doc_id: DocId, row_id: RowId) -> Result<()> {
        self.inner.write_slot(doc_id.0, &row_id.0.to_le_bytes())
    }

    pub fn remove(&mut self, doc_id: DocId) -> Result<()> {
        self.inner.write_slot(doc_id.0, &RowId::UNDEFINED.0.to_le_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

/// Result of [`verify`]: non-empty vectors indicate a broken spec §3.2
/// invariant 10 ("the doc-id-vector and rowid-vector are mutual inverses
/// over live rows").
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// `(row_id, doc_id)` pairs present in `RowIdToDocIdVector` that don't
    /// map back from `DocIdToRowIdVector`.
    pub unreachable_forward: Vec<(RowId, DocId)>,
    /// `(doc_id, row_id)` pairs present in `DocIdToRowIdVector` that don't
    /// map back from `RowIdToDocIdVector`.
    pub unreachable_backward: Vec<(DocId, RowId)>,
    /// Doc-ids claimed by more than one row-id.
    pub duplicated_doc_ids: Vec<DocId>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.unreachable_forward.is_empty() && self.unreachable_backward.is_empty() && self.duplicated_doc_ids.is_empty()
    }
}

/// Walk both files and report unreachable or duplicated entries (spec
/// §4.10: "Verification walks all pages and reports unreachable or
/// duplicated entries").
pub fn verify(forward: &mut RowIdToDocIdVector, backward: &mut DocIdToRowIdVector) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    let mut seen_doc_ids = std::collections::HashMap::new();

    for (row_key, bytes) in forward.inner.live_entries()? {
        let row_id = RowId(row_key as u64);
        let doc_id = DocId(u32::from_le_bytes(bytes.try_into().unwrap()));
        if let Some(&first_row) = seen_doc_ids.get(&doc_id) {
            if first_row != row_id {
                report.duplicated_doc_ids.push(doc_id);
            }
        } else {
            seen_doc_ids.insert(doc_id, row_id);
        }
        match backward.get(doc_id)? {
            Some(back) if back == row_id => {}
            _ => report.unreachable_forward.push((row_id, doc_id)),
        }
    }

    for (doc_key, bytes) in backward.inner.live_entries()? {
        let doc_id = DocId(doc_key);
        let row_id = RowId(u64::from_le_bytes(bytes.try_into().unwrap()));
        match forward.get(row_id)? {
            Some(fwd) if fwd == doc_id => {}
            _ => report.unreachable_backward.push((doc_id, row_id)),
        }
    }

    report.duplicated_doc_ids.sort_by_key(|d| d.0);
    report.duplicated_doc_ids.dedup();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("row_to_doc.bin");
        {
            let mut v = RowIdToDocIdVector::create(&path, 256).unwrap();
            v.set(RowId(3), DocId(7)).unwrap();
            v.set(RowId(300), DocId(99)).unwrap();
        }
        let mut v = RowIdToDocIdVector::open(&path, 256).unwrap();
        assert_eq!(v.get(RowId(3)).unwrap(), Some(DocId(7)));
        assert_eq!(v.get(RowId(300)).unwrap(), Some(DocId(99)));
        assert_eq!(v.get(RowId(4)).unwrap(), None);
    }

    #[test]
    fn remove_clears_a_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let mut v = RowIdToDocIdVector::create(dir.path().join("f.bin"), 64).unwrap();
        v.set(RowId(1), DocId(1)).unwrap();
        v.remove(RowId(1)).unwrap();
        assert_eq!(v.get(RowId(1)).unwrap(), None);
    }

    #[test]
    fn verify_reports_clean_on_consistent_mutual_inverse() {
        let dir = tempfile::tempdir().unwrap();
        let mut fwd = RowIdToDocIdVector::create(dir.path().join("r2d.bin"), 64).unwrap();
        let mut bwd = DocIdToRowIdVector::create(dir.path().join("d2r.bin"), 64).unwrap();
        for i in 0..5u32 {
            fwd.set(RowId(i as u64), DocId(i)).unwrap();
            bwd.set(DocId(i), RowId(i as u64)).unwrap();
        }
        let report = verify(&mut fwd, &mut bwd).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn verify_flags_an_unreachable_forward_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut fwd = RowIdToDocIdVector::create(dir.path().join("r2d.bin"), 64).unwrap();
        let mut bwd = DocIdToRowIdVector::create(dir.path().join("d2r.bin"), 64).unwrap();
        fwd.set(RowId(0), DocId(0)).unwrap();
        // `bwd` never records the inverse mapping.
        let report = verify(&mut fwd, &mut bwd).unwrap();
        assert_eq!(report.unreachable_forward, vec![(RowId(0), DocId(0))]);
    }
}
