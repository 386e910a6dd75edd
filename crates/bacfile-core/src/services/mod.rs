//! AtomicReadFile (service choice 6) and AtomicWriteFile (service choice 7).
//!
//! Both directions are provided: requests encode on the client and decode on
//! the serving device; acks encode on the device and decode on the client.
//! Within each request the access method is a two-armed choice, stream access
//! under context tag 0 and record access under context tag 1.

pub mod atomic_read_file;
pub mod atomic_write_file;

/// Context tag wrapping stream-access parameters.
pub(crate) const STREAM_ACCESS_TAG: u8 = 0;
/// Context tag wrapping record-access parameters.
pub(crate) const RECORD_ACCESS_TAG: u8 = 1;
