//! BACnet file-service encoding and decoding in pure Rust.
//!
//! `bacfile-core` carries the wire side of the AtomicReadFile and
//! AtomicWriteFile services: the tag system, primitive encoders, NPDU and APDU
//! headers, and the request/acknowledgement codecs in both directions. It is
//! `no_std`-compatible and never allocates on the encode path.
//!
//! # Feature flags
//!
//! - **`std`** (default): enables `std::error::Error` implementations.
//! - **`alloc`** (default): enables decoders that collect record lists.
//! - **`serde`**: derives `Serialize`/`Deserialize` on core types.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

/// APDU headers for confirmed requests, complex acks, errors, rejects and aborts.
pub mod apdu;
/// Binary encoding primitives, tag system, and zero-copy reader/writer.
pub mod encoding;
/// Error types for encoding and decoding operations.
pub mod error;
/// NPDU (Network Protocol Data Unit) encoding and decoding.
pub mod npdu;
/// AtomicReadFile and AtomicWriteFile codecs.
pub mod services;
/// Object identifiers, object types, and error class/code enumerations.
pub mod types;

pub use error::{DecodeError, EncodeError};
