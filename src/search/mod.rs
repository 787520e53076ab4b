//! Query execution and result post-processing (C8/C9, spec §4.8/§4.9).
//! `info` carries the per-query statistics bundle every lower level reads;
//! `executor` drives the document-at-a-time scan; `results` holds the
//! post-processing (scoring blend, clustering, KWIC, cursor) done once a
//! scan's hits are collected.

pub mod executor;
pub mod info;
pub mod results;

pub use executor::{CancelToken, Executor, ExecutorMode, Hit};
pub use info::{DocumentStats, ScoringParameters, SearchInformation, WordData};
pub use results::{AdjustMethod, ClusterCombiner, ClusterParameters, ProjectionKind, ResultSet, SortKey};
