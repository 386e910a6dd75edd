use bacfile_core::apdu::ErrorPdu;
use bacfile_core::types::{ErrorClass, ErrorCode, ObjectId};
use bacfile_datalink::DataLinkError;
use thiserror::Error;

/// A classified failure of a file service request.
///
/// Every variant maps onto the BACnet error class and code reported back to
/// the requester in an Error PDU.
#[derive(Debug, Error)]
pub enum FileServiceError {
    #[error("{0} is not a file object")]
    InconsistentObjectType(ObjectId),
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    #[error("request access method does not match the file object")]
    InvalidFileAccessMethod,
    #[error("invalid file start position {0}")]
    InvalidFileStartPosition(i32),
    #[error("file is read-only")]
    FileAccessDenied,
    #[error("file storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl FileServiceError {
    pub const fn error_class(&self) -> ErrorClass {
        match self {
            Self::UnknownObject(_) => ErrorClass::Object,
            Self::Storage(_) => ErrorClass::Device,
            Self::InconsistentObjectType(_)
            | Self::InvalidFileAccessMethod
            | Self::InvalidFileStartPosition(_)
            | Self::FileAccessDenied => ErrorClass::Services,
        }
    }

    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::InconsistentObjectType(_) => ErrorCode::InconsistentObjectType,
            Self::UnknownObject(_) => ErrorCode::UnknownObject,
            Self::InvalidFileAccessMethod => ErrorCode::InvalidFileAccessMethod,
            Self::InvalidFileStartPosition(_) => ErrorCode::InvalidFileStartPosition,
            Self::FileAccessDenied => ErrorCode::FileAccessDenied,
            Self::Storage(_) => ErrorCode::OperationalProblem,
        }
    }

    /// The Error PDU answering the confirmed request `invoke_id`.
    pub const fn to_error_pdu(&self, invoke_id: u8, service_choice: u8) -> ErrorPdu {
        ErrorPdu::new(
            invoke_id,
            service_choice,
            self.error_class(),
            self.error_code(),
        )
    }
}

/// Failures of the device loop itself, as opposed to a request it answered.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("datalink error: {0}")]
    DataLink(#[from] DataLinkError),
    #[error("encode error: {0}")]
    Encode(#[from] bacfile_core::EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] bacfile_core::DecodeError),
}
