//! Client/server wire protocol: packet framing, block
//! compression, and the varint/data-block codec built on top of them.

pub mod codec;
pub mod compression;
pub mod packet;

pub use codec::{decode_block, encode_block, read_uvarint, write_uvarint};
pub use compression::{compress, decompress, CompressedBlock, CompressionMethod};
pub use packet::{
    ClientPacketId, ExceptionInfo, HelloRequest, HelloResponse, ProcessingStage, ProgressInfo,
    QueryRequest, ServerPacketId,
};
