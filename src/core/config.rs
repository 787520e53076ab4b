//! Engine configuration (spec §6). Grounded on the teacher's `core/config.rs`
//! (flat `Config` struct with a `Default` impl documenting the production
//! defaults); split into an engine-wide `Config` plus per-file option structs
//! since a single process may open several B+tree and inverted files with
//! independent schemas and clustering knobs.

use std::path::PathBuf;

use crate::core::types::{FieldType, SortDirection};

/// Engine-wide knobs: paging, memory budget, cache sizing (spec §3.1/§6).
#[derive(Debug, Clone)]
pub struct Config {
    pub storage_path: PathBuf,

    /// Page size in bytes, shared by every file the engine opens.
    pub page_size: usize,

    pub memory_limit: usize,
    pub cache_size: usize,

    /// Pages held resident per file before the `lru` cache starts evicting.
    pub page_cache_capacity: usize,

    /// If set, a `MemoryExhaust` error triggers one aggressive unfix-and-retry
    /// pass instead of propagating immediately (spec §7).
    pub catch_memory_exhaust: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./data"),
            page_size: 8 * 1024,
            memory_limit: 100 * 1024 * 1024,
            cache_size: 10 * 1024 * 1024,
            page_cache_capacity: 4096,
            catch_memory_exhaust: true,
        }
    }
}

/// `UniquenessType` (spec §6): what must be unique across a key's leaf-chain
/// siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniquenessType {
    None,
    Key,
    KeyAndValue,
}

/// Whether a B+tree's KeyInfo slots store the key inline or indirect via a
/// KeyObject (original_source `KeyInformation.cpp`, chosen once at
/// file-create time from the schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLayout {
    /// Every field is fixed-width and fits the node's inline budget.
    Inline,
    /// At least one field is variable-length or exceeds the inline budget;
    /// the key is stored as a KeyObject and the slot holds its `ObjectId`.
    Indirect,
}

/// Per-B+tree-file options (spec §6's schema/split/uniqueness knobs).
#[derive(Debug, Clone)]
pub struct BTreeFileOptions {
    pub field_types: Vec<FieldType>,
    pub field_max_lengths: Vec<u32>,
    pub field_directions: Vec<SortDirection>,

    /// Percent of keys that stay in the old node on a split (spec §3.1/§6).
    pub node_key_divide_rate: u32,

    pub uniqueness_type: UniquenessType,
    pub key_layout: KeyLayout,

    /// Whether a delete triggers a sibling merge/redistribution pass.
    /// Default `false`: no merge-on-delete, leaf imbalance after deletes is
    /// an accepted cost (resolved open question, see DESIGN.md).
    pub merge_on_delete: bool,
}

impl BTreeFileOptions {
    pub fn new(
        field_types: Vec<FieldType>,
        field_max_lengths: Vec<u32>,
        field_directions: Vec<SortDirection>,
    ) -> Self {
        let has_variable_field = field_types
            .iter()
            .any(|t| matches!(t, FieldType::VarChar { .. } | FieldType::Array { .. }));
        let key_layout = if has_variable_field {
            KeyLayout::Indirect
        } else {
            KeyLayout::Inline
        };
        BTreeFileOptions {
            field_types,
            field_max_lengths,
            field_directions,
            node_key_divide_rate: 50,
            uniqueness_type: UniquenessType::Key,
            key_layout,
            merge_on_delete: false,
        }
    }
}

/// Per-inverted-file options (spec §4.9's clustering knobs).
#[derive(Debug, Clone)]
pub struct InvertedFileOptions {
    /// Detail-cluster merge window, must be ≥ 2.
    pub merge_cluster_distance: u32,

    /// Batch size for incremental rough clustering, must be ≥ 2.
    pub max_rough_cluster_count: u32,

    /// Threshold inside a rough cluster. `None` (or 0) resolves to the
    /// midpoint between 1.0 and the global threshold at clustering time.
    pub local_clustered_limit: Option<f64>,
}

impl Default for InvertedFileOptions {
    fn default() -> Self {
        InvertedFileOptions {
            merge_cluster_distance: 32,
            max_rough_cluster_count: 1024,
            local_clustered_limit: None,
        }
    }
}
