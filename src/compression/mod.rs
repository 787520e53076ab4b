//! Integer and block compression codecs shared by the field codec (C2) and
//! the inverted list store (C5). Grounded on the teacher's
//! `compression/{delta,vbyte,compress}.rs`.

pub mod compress;
pub mod delta;
pub mod vbyte;

pub use compress::{CompressedBlock, CompressionPriority, CompressionType, EncodedIntegerBlock, IntegerEncodingType};
pub use delta::DeltaEncoder;
pub use vbyte::VByteEncoder;
