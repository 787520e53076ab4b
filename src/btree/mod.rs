//! Ordered B+tree engine (C3/C4, spec §3/§4). `node` defines the on-page
//! layout; `ops` implements insert/delete/search/scan over it.

pub mod node;
pub mod ops;

pub use node::{KeyInfo, NodeBody, NodePageHeader, StoredKey};
pub use ops::{BTreeFile, Bound, SearchCondition};
