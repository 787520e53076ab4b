//! Parallel query orchestration (C12, spec §4.12): band partitioning,
//! per-band execution and K-way merge, built on `rayon`.

pub mod orchestrator;

pub use orchestrator::{partition_by_cost, Band, Orchestrator};
