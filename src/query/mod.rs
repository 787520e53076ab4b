//! Query plan trees (C6/C7, spec §4.6/§4.7). `leaf` evaluates single-term
//! expressions over positions; `operator` combines leaves (and other
//! operators) with boolean/weighted logic and contributes scores.

pub mod leaf;
pub mod operator;

pub use leaf::{
    AtomicOrLeafNode, LeafNode, LocationListManager, NormalLeafNode, NormalShortLeafNode, PooledLocationListIterator,
    ShortLeafNode, ShortLeafNodeCompatible, SimpleLeafNode,
};
pub use operator::{And, AndNot, DocumentScore, Or, OperatorNode, OperatorTermNode, WeightedOr, Within};
