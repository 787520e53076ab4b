//! Ambient core: error taxonomy, configuration, shared types, and the
//! transaction/fix-mode handle (spec §3.1, §6, §7).

pub mod config;
pub mod error;
pub mod transaction;
pub mod types;

pub use config::{BTreeFileOptions, Config, InvertedFileOptions, KeyLayout, UniquenessType};
pub use error::{Error, Result};
pub use transaction::{FixMode, TransactionHandle};
pub use types::{
    AreaId, DocId, FieldType, FieldValue, ObjectId, PageId, RowId, SortDirection, Tuple,
};
