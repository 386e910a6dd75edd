use bacfile_core::encoding::writer::Writer;
use bacfile_core::services::atomic_read_file::{
    AtomicReadFileAck, AtomicReadFileAckAccess, SERVICE_ATOMIC_READ_FILE,
};
use bacfile_core::services::atomic_write_file::{AtomicWriteFileAck, SERVICE_ATOMIC_WRITE_FILE};
use bacfile_core::EncodeError;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::UnboundedSender;

/// Owned AtomicReadFile acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomicReadFileResult {
    Stream {
        end_of_file: bool,
        file_start_position: i32,
        file_data: Vec<u8>,
    },
    Record {
        end_of_file: bool,
        file_start_record: i32,
        returned_record_count: u32,
        file_record_data: Vec<Vec<u8>>,
    },
}

impl AtomicReadFileResult {
    pub const fn end_of_file(&self) -> bool {
        match self {
            Self::Stream { end_of_file, .. } | Self::Record { end_of_file, .. } => *end_of_file,
        }
    }

    /// Borrowed wire form of this result.
    pub fn as_ack(&self) -> AtomicReadFileAck<'_> {
        match self {
            Self::Stream {
                end_of_file,
                file_start_position,
                file_data,
            } => AtomicReadFileAck {
                end_of_file: *end_of_file,
                access_method: AtomicReadFileAckAccess::Stream {
                    file_start_position: *file_start_position,
                    file_data,
                },
            },
            Self::Record {
                end_of_file,
                file_start_record,
                returned_record_count,
                file_record_data,
            } => AtomicReadFileAck {
                end_of_file: *end_of_file,
                access_method: AtomicReadFileAckAccess::Record {
                    file_start_record: *file_start_record,
                    returned_record_count: *returned_record_count,
                    file_record_data: file_record_data.iter().map(Vec::as_slice).collect(),
                },
            },
        }
    }
}

impl From<AtomicReadFileAck<'_>> for AtomicReadFileResult {
    fn from(ack: AtomicReadFileAck<'_>) -> Self {
        match ack.access_method {
            AtomicReadFileAckAccess::Stream {
                file_start_position,
                file_data,
            } => Self::Stream {
                end_of_file: ack.end_of_file,
                file_start_position,
                file_data: file_data.to_vec(),
            },
            AtomicReadFileAckAccess::Record {
                file_start_record,
                returned_record_count,
                file_record_data,
            } => Self::Record {
                end_of_file: ack.end_of_file,
                file_start_record,
                returned_record_count,
                file_record_data: file_record_data.into_iter().map(<[u8]>::to_vec).collect(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicWriteFileResult {
    Stream { file_start_position: i32 },
    Record { file_start_record: i32 },
}

impl AtomicWriteFileResult {
    pub const fn as_ack(&self) -> AtomicWriteFileAck {
        match *self {
            Self::Stream {
                file_start_position,
            } => AtomicWriteFileAck::Stream {
                file_start_position,
            },
            Self::Record { file_start_record } => {
                AtomicWriteFileAck::Record { file_start_record }
            }
        }
    }
}

impl From<AtomicWriteFileAck> for AtomicWriteFileResult {
    fn from(ack: AtomicWriteFileAck) -> Self {
        match ack {
            AtomicWriteFileAck::Stream {
                file_start_position,
            } => Self::Stream {
                file_start_position,
            },
            AtomicWriteFileAck::Record { file_start_record } => {
                Self::Record { file_start_record }
            }
        }
    }
}

/// Acknowledgement produced by a file service handler, tagged with the
/// invoke id of the request it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileServiceAck {
    Read {
        invoke_id: u8,
        result: AtomicReadFileResult,
    },
    Write {
        invoke_id: u8,
        result: AtomicWriteFileResult,
    },
}

impl FileServiceAck {
    pub const fn invoke_id(&self) -> u8 {
        match self {
            Self::Read { invoke_id, .. } | Self::Write { invoke_id, .. } => *invoke_id,
        }
    }

    pub const fn service_choice(&self) -> u8 {
        match self {
            Self::Read { .. } => SERVICE_ATOMIC_READ_FILE,
            Self::Write { .. } => SERVICE_ATOMIC_WRITE_FILE,
        }
    }

    /// Encodes the ComplexAck APDU.
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Self::Read { invoke_id, result } => result.as_ack().encode(w, *invoke_id),
            Self::Write { invoke_id, result } => result.as_ack().encode(w, *invoke_id),
        }
    }
}

/// Where handlers deliver their acknowledgements.
pub trait ResponseChannel {
    fn send(&self, ack: FileServiceAck);
}

impl<T: ResponseChannel + ?Sized> ResponseChannel for &T {
    fn send(&self, ack: FileServiceAck) {
        (**self).send(ack)
    }
}

impl<T: ResponseChannel + ?Sized> ResponseChannel for Arc<T> {
    fn send(&self, ack: FileServiceAck) {
        (**self).send(ack)
    }
}

impl ResponseChannel for UnboundedSender<FileServiceAck> {
    fn send(&self, ack: FileServiceAck) {
        let invoke_id = ack.invoke_id();
        if UnboundedSender::send(self, ack).is_err() {
            log::warn!("ack for invoke id {invoke_id} dropped: receiver closed");
        }
    }
}

/// Holds the single ack of one request until the caller collects it.
#[derive(Debug, Default)]
pub struct ReplySlot {
    ack: Mutex<Option<FileServiceAck>>,
}

impl ReplySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Option<FileServiceAck> {
        self.ack
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl ResponseChannel for ReplySlot {
    fn send(&self, ack: FileServiceAck) {
        let previous = self
            .ack
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(ack);
        if let Some(previous) = previous {
            log::warn!(
                "reply slot overwritten; discarding ack for invoke id {}",
                previous.invoke_id()
            );
        }
    }
}
