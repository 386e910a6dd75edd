//! File-access services for a BACnet device.
//!
//! A device exposes file objects through an [`ObjectResolver`]. Each object is
//! either record-accessed or stream-accessed ([`FileObject`]), and
//! [`FileServices`] validates AtomicReadFile / AtomicWriteFile requests
//! against it before delegating the actual read or write to the object.
//!
//! [`FileDevice`] drives the handlers from a [`bacfile_datalink::DataLink`],
//! turning failures into Error, Reject or Abort PDUs.

pub mod device;
pub mod disk;
pub mod error;
pub mod file;
pub mod memory;
pub mod resolver;
pub mod response;
pub mod service;

pub use device::FileDevice;
pub use disk::DiskStreamFile;
pub use error::{DeviceError, FileServiceError};
pub use file::{
    FileAccessMethod, FileObject, RecordAccessFile, RecordRead, StreamAccessFile, StreamRead,
};
pub use memory::{MemoryRecordFile, MemoryStreamFile};
pub use resolver::{ObjectResolver, ObjectTable};
pub use response::{
    AtomicReadFileResult, AtomicWriteFileResult, FileServiceAck, ReplySlot, ResponseChannel,
};
pub use service::FileServices;
