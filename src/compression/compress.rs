use crate::compression::delta::DeltaEncoder;
use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, Result};
use serde::{Serialize, Deserialize};

/// Compressed block storage, used by the field codec's `Compressed`/
/// `DivideCompressed` outside-variable object types (spec §4.2).
#[derive(Serialize, Deserialize)]
pub struct CompressedBlock {
    pub data: Vec<u8>,
    pub original_size: usize,
    pub compression: CompressionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    /// Fast codec (~500 MB/s), ratio 2-3x.
    LZ4,
    /// Better ratio (3-5x), slower (~200 MB/s).
    Zstd,
}

impl CompressedBlock {
    pub fn compress(data: &[u8], compression: CompressionType) -> Result<Self> {
        let compressed = match compression {
            CompressionType::None => data.to_vec(),
            CompressionType::LZ4 => lz4::block::compress(data, None, false)
                .map_err(|e| Error::Io(e.to_string()))?,
            CompressionType::Zstd => {
                zstd::encode_all(data, 3).map_err(|e| Error::Io(e.to_string()))?
            }
        };

        Ok(CompressedBlock {
            data: compressed,
            original_size: data.len(),
            compression,
        })
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        match self.compression {
            CompressionType::None => Ok(self.data.clone()),
            CompressionType::LZ4 => {
                lz4::block::decompress(&self.data, Some(self.original_size as i32))
                    .map_err(|e| Error::Io(e.to_string()))
            }
            CompressionType::Zstd => {
                zstd::decode_all(&self.data[..]).map_err(|e| Error::Io(e.to_string()))
            }
        }
    }

    /// Choose a codec for the two use cases the field codec actually needs:
    /// a fast option for frequently-touched outside-variable fields, and a
    /// ratio option for cold/archival ones.
    pub fn compress_auto(data: &[u8], priority: CompressionPriority) -> Result<Self> {
        let compression = match priority {
            CompressionPriority::Speed => CompressionType::LZ4,
            CompressionPriority::Ratio => CompressionType::Zstd,
        };
        Self::compress(data, compression)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CompressionPriority {
    Speed,
    Ratio,
}

/// Specialized integer encoding, applied to doc-id lists and position lists
/// before any general-purpose byte compression (spec §3.1/§6).
pub struct EncodedIntegerBlock {
    pub data: Vec<u8>,
    pub original_count: usize,
    pub encoding: IntegerEncodingType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerEncodingType {
    /// Raw little-endian u32 array, 4 bytes each.
    None,
    /// Delta-of-sorted-values then VByte, best for doc-id lists.
    Delta,
    /// VByte only, best for small values (positions, term frequency).
    VByte,
}

impl EncodedIntegerBlock {
    pub fn encode(nums: &[u32], encoding: IntegerEncodingType) -> Result<Self> {
        let encoded = match encoding {
            IntegerEncodingType::None => {
                let mut bytes = Vec::with_capacity(nums.len() * 4);
                for &num in nums {
                    bytes.extend_from_slice(&num.to_le_bytes());
                }
                bytes
            }
            IntegerEncodingType::Delta => DeltaEncoder::encode_u32_list(nums)?,
            IntegerEncodingType::VByte => VByteEncoder::encode_u32_list(nums)?,
        };

        Ok(EncodedIntegerBlock {
            data: encoded,
            original_count: nums.len(),
            encoding,
        })
    }

    pub fn decode(&self) -> Result<Vec<u32>> {
        match self.encoding {
            IntegerEncodingType::None => Ok(self
                .data
                .chunks_exact(4)
                .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect()),
            IntegerEncodingType::Delta => DeltaEncoder::decode_u32_list(&self.data),
            IntegerEncodingType::VByte => VByteEncoder::decode_u32_list(&self.data),
        }
    }

    /// Apply general compression after integer encoding (delta/vbyte first,
    /// then LZ4), the ordering the field/inverted codecs rely on.
    pub fn compress_with_lz4(&self) -> Result<CompressedBlock> {
        CompressedBlock::compress(&self.data, CompressionType::LZ4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_block_round_trips_each_encoding() {
        let nums: Vec<u32> = vec![3, 3, 7, 9, 9, 9, 100, 100_000];
        for encoding in [
            IntegerEncodingType::None,
            IntegerEncodingType::Delta,
            IntegerEncodingType::VByte,
        ] {
            let block = EncodedIntegerBlock::encode(&nums, encoding).unwrap();
            assert_eq!(block.decode().unwrap(), nums);
        }
    }

    #[test]
    fn compressed_block_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(8);
        for ty in [CompressionType::None, CompressionType::LZ4, CompressionType::Zstd] {
            let block = CompressedBlock::compress(&data, ty).unwrap();
            assert_eq!(block.decompress().unwrap(), data);
        }
    }
}
