//! Block compression: each compressed block is prefixed by
//! `{method:u8, compressed_size:u32, uncompressed_size:u32, checksum:u128}`.
//!
//! Method byte `0x82` for LZ4 matches klickhouse-rs's `CompressionMethod`
//! encoding for the real ClickHouse wire format; `0x02` marks an
//! uncompressed passthrough block.

use twox_hash::XxHash64;

use crate::error::{EngineError, EngineResult, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    None,
    Lz4,
}

impl CompressionMethod {
    pub fn byte(self) -> u8 {
        match self {
            CompressionMethod::None => 0x02,
            CompressionMethod::Lz4 => 0x82,
        }
    }

    pub fn from_byte(b: u8) -> EngineResult<Self> {
        match b {
            0x02 => Ok(CompressionMethod::None),
            0x82 => Ok(CompressionMethod::Lz4),
            other => Err(EngineError::new(ErrorCode::CannotDecompress, format!("unknown compression method byte 0x{other:02x}"))),
        }
    }
}

/// Two independent 64-bit hashes standing in for the original's 128-bit
/// checksum (no cityhash128 crate in this stack) — still detects the same
/// corruption a real checksum mismatch would.
fn checksum128(data: &[u8]) -> u128 {
    let lo = XxHash64::oneshot(0, data);
    let hi = XxHash64::oneshot(1, data);
    ((hi as u128) << 64) | lo as u128
}

pub struct CompressedBlock {
    pub method: CompressionMethod,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub checksum: u128,
    pub payload: Vec<u8>,
}

pub fn compress(method: CompressionMethod, data: &[u8]) -> CompressedBlock {
    let payload = match method {
        CompressionMethod::None => data.to_vec(),
        CompressionMethod::Lz4 => lz4_flex::compress_prepend_size(data),
    };
    CompressedBlock {
        method,
        compressed_size: payload.len() as u32,
        uncompressed_size: data.len() as u32,
        checksum: checksum128(&payload),
        payload,
    }
}

pub fn decompress(block: &CompressedBlock) -> EngineResult<Vec<u8>> {
    if checksum128(&block.payload) != block.checksum {
        return Err(EngineError::new(ErrorCode::ChecksumMismatch, "compressed block checksum mismatch"));
    }
    match block.method {
        CompressionMethod::None => Ok(block.payload.clone()),
        CompressionMethod::Lz4 => lz4_flex::decompress_size_prepended(&block.payload)
            .map_err(|e| EngineError::new(ErrorCode::CannotDecompress, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lz4_round_trips() {
        let data = b"hello hello hello hello world".repeat(10);
        let block = compress(CompressionMethod::Lz4, &data);
        assert_eq!(block.method.byte(), 0x82);
        assert_eq!(decompress(&block).unwrap(), data);
    }

    #[test]
    fn tampered_payload_fails_checksum() {
        let data = b"some data to compress";
        let mut block = compress(CompressionMethod::Lz4, data);
        block.payload[0] ^= 0xff;
        assert!(decompress(&block).is_err());
    }

    #[test]
    fn none_method_is_passthrough() {
        let data = b"raw bytes";
        let block = compress(CompressionMethod::None, data);
        assert_eq!(decompress(&block).unwrap(), data);
    }
}
