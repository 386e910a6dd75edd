/// Encode/decode functions for the primitive types the file services carry.
pub mod primitives;
/// Zero-copy byte reader for decoding BACnet frames.
pub mod reader;
/// BACnet tag system (application, context, opening/closing).
pub mod tag;
/// Byte writer for encoding BACnet frames into a caller-owned buffer.
pub mod writer;
