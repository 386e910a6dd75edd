//! Support code for the `bacfile-server`, `bacnet-readfile` and
//! `bacnet-writefile` binaries.

pub mod client;
pub mod hex;
pub mod manifest;

pub use client::{ClientError, FileClient};
pub use manifest::{AccessArg, FileEntry, Manifest, ManifestError};
