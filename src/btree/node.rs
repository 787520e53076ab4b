//! B+tree node/leaf layout (C3, spec §3.1/§4.3/§6). Grounded on the
//! teacher's `storage/segment.rs` (`SegmentHeader`, fixed versioned-format
//! idiom via `serde`), generalized from a flat segment header into the
//! leaf/non-leaf dual-shape node header plus its KeyTable.
//!
//! Node pages are serialized with `bincode` into area 1 of their backing
//! page rather than hand-packed to the byte offsets spec.md's on-disk
//! layout names; there is no pre-existing file to stay bit-compatible
//! with, so the documented field list and ordering is kept but the wire
//! encoding is bincode's. See DESIGN.md.

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{ObjectId, PageId, Tuple};

/// Present on every node page (spec §6: 20 bytes non-leaf, 28 bytes leaf —
/// here, the logical field set rather than the literal byte count).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePageHeader {
    pub parent_page_id: PageId,
    pub prev_physical_page_id: PageId,
    pub next_physical_page_id: PageId,
    pub key_info_count: u32,
    pub used_key_info_count: u32,
    /// `Some` only on leaf pages (spec §3.1).
    pub prev_leaf_page_id: Option<PageId>,
    pub next_leaf_page_id: Option<PageId>,
}

impl NodePageHeader {
    pub fn new_leaf() -> Self {
        NodePageHeader {
            parent_page_id: PageId::INVALID,
            prev_physical_page_id: PageId::INVALID,
            next_physical_page_id: PageId::INVALID,
            key_info_count: 0,
            used_key_info_count: 0,
            prev_leaf_page_id: Some(PageId::INVALID),
            next_leaf_page_id: Some(PageId::INVALID),
        }
    }

    pub fn new_non_leaf() -> Self {
        NodePageHeader {
            parent_page_id: PageId::INVALID,
            prev_physical_page_id: PageId::INVALID,
            next_physical_page_id: PageId::INVALID,
            key_info_count: 0,
            used_key_info_count: 0,
            prev_leaf_page_id: None,
            next_leaf_page_id: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.prev_leaf_page_id.is_some()
    }
}

/// Where a KeyInfo slot's key tuple actually lives (spec §3.1's two
/// KeyInformation shapes, chosen once per file via `KeyLayout`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoredKey {
    /// Key-in-KeyInfo: the tuple is stored directly in the slot.
    Inline(Tuple),
    /// Key-in-KeyObject: the slot holds a pointer to a separate KeyObject
    /// area (possibly on a chained physical page).
    Indirect(ObjectId),
}

/// One slot of the KeyTable (spec §6's non-leaf/leaf KeyInformation shapes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyInfo {
    NonLeaf {
        child_page_id: PageId,
        key: StoredKey,
    },
    Leaf {
        value_object_id: ObjectId,
        key: StoredKey,
    },
}

impl KeyInfo {
    pub fn key(&self) -> &StoredKey {
        match self {
            KeyInfo::NonLeaf { key, .. } => key,
            KeyInfo::Leaf { key, .. } => key,
        }
    }
}

/// A node page's header plus its dense KeyInfo array, the unit the B+tree
/// operations module reads and rewrites as a whole per fix (spec §4.3: "The
/// KeyTable is a single area").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeBody {
    pub header: NodePageHeader,
    pub entries: Vec<KeyInfo>,
}

impl NodeBody {
    pub fn new_leaf() -> Self {
        NodeBody {
            header: NodePageHeader::new_leaf(),
            entries: Vec::new(),
        }
    }

    pub fn new_non_leaf() -> Self {
        NodeBody {
            header: NodePageHeader::new_non_leaf(),
            entries: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.header.is_leaf()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
