//! Collections shared across the engine that have no natural home in a
//! single component (spec §4.11).

pub mod large_vector;

pub use large_vector::LargeVector;
