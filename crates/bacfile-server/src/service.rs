//! AtomicReadFile and AtomicWriteFile request handlers.

use crate::error::FileServiceError;
use crate::file::FileObject;
use crate::resolver::ObjectResolver;
use crate::response::{
    AtomicReadFileResult, AtomicWriteFileResult, FileServiceAck, ResponseChannel,
};
use bacfile_core::services::atomic_read_file::{
    AtomicReadFileAccessMethod, AtomicReadFileRequest,
};
use bacfile_core::services::atomic_write_file::{
    AtomicWriteFileAccessMethod, AtomicWriteFileRequest,
};
use bacfile_core::types::ObjectId;

/// Serves file requests against the objects of `resolver`, delivering
/// acknowledgements to `responses`.
///
/// Each handler validates in a fixed order (object type, existence, access
/// method, then start position for reads or the read-only flag for writes)
/// and only then calls into the file object. On failure nothing is sent and
/// the classified error is returned to the caller.
#[derive(Debug)]
pub struct FileServices<R, C> {
    resolver: R,
    responses: C,
}

impl<R: ObjectResolver, C: ResponseChannel> FileServices<R, C> {
    pub fn new(resolver: R, responses: C) -> Self {
        Self {
            resolver,
            responses,
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn responses(&self) -> &C {
        &self.responses
    }

    fn resolve_file(&self, object_id: ObjectId) -> Result<FileObject, FileServiceError> {
        if !object_id.is_file() {
            log::debug!("file request for non-file object {object_id}");
            return Err(FileServiceError::InconsistentObjectType(object_id));
        }
        self.resolver.resolve(object_id).ok_or_else(|| {
            log::debug!("file request for unknown object {object_id}");
            FileServiceError::UnknownObject(object_id)
        })
    }

    pub fn atomic_read_file(
        &self,
        request: &AtomicReadFileRequest,
    ) -> Result<(), FileServiceError> {
        log::debug!(
            "AtomicReadFile invoke={} {} {:?}",
            request.invoke_id,
            request.file_object_id,
            request.access_method
        );
        let file = self.resolve_file(request.file_object_id)?;

        let result = match (request.access_method, file) {
            (
                AtomicReadFileAccessMethod::Record {
                    file_start_record,
                    requested_record_count,
                },
                FileObject::Record(file),
            ) => {
                check_read_start(file_start_record, file.len())?;
                let read = file.read_records(file_start_record, requested_record_count)?;
                AtomicReadFileResult::Record {
                    end_of_file: read.end_of_file,
                    file_start_record,
                    returned_record_count: read.records.len() as u32,
                    file_record_data: read.records,
                }
            }
            (
                AtomicReadFileAccessMethod::Stream {
                    file_start_position,
                    requested_octet_count,
                },
                FileObject::Stream(file),
            ) => {
                check_read_start(file_start_position, file.len())?;
                let read = file.read_stream(file_start_position, requested_octet_count)?;
                AtomicReadFileResult::Stream {
                    end_of_file: read.end_of_file,
                    file_start_position,
                    file_data: read.data,
                }
            }
            (_, file) => {
                log::debug!(
                    "AtomicReadFile access method mismatch: object is {:?}",
                    file.access_method()
                );
                return Err(FileServiceError::InvalidFileAccessMethod);
            }
        };

        self.responses.send(FileServiceAck::Read {
            invoke_id: request.invoke_id,
            result,
        });
        Ok(())
    }

    pub fn atomic_write_file(
        &self,
        request: &AtomicWriteFileRequest<'_>,
    ) -> Result<(), FileServiceError> {
        log::debug!(
            "AtomicWriteFile invoke={} {} start={}",
            request.invoke_id,
            request.file_object_id,
            request.access_method.start()
        );
        let file = self.resolve_file(request.file_object_id)?;

        let result = match (&request.access_method, file) {
            (
                AtomicWriteFileAccessMethod::Record {
                    file_start_record,
                    record_count,
                    file_record_data,
                },
                FileObject::Record(file),
            ) => {
                check_writable(file.read_only())?;
                let actual =
                    file.write_records(*file_start_record, *record_count, file_record_data)?;
                AtomicWriteFileResult::Record {
                    file_start_record: actual,
                }
            }
            (
                AtomicWriteFileAccessMethod::Stream {
                    file_start_position,
                    file_data,
                },
                FileObject::Stream(file),
            ) => {
                check_writable(file.read_only())?;
                let actual = file.write_stream(*file_start_position, file_data)?;
                AtomicWriteFileResult::Stream {
                    file_start_position: actual,
                }
            }
            (_, file) => {
                log::debug!(
                    "AtomicWriteFile access method mismatch: object is {:?}",
                    file.access_method()
                );
                return Err(FileServiceError::InvalidFileAccessMethod);
            }
        };

        self.responses.send(FileServiceAck::Write {
            invoke_id: request.invoke_id,
            result,
        });
        Ok(())
    }
}

/// Reads must start inside the file. An empty file has no valid start.
fn check_read_start(start: i32, len: u64) -> Result<(), FileServiceError> {
    if start < 0 || start as u64 >= len {
        log::debug!("read start {start} outside file of length {len}");
        return Err(FileServiceError::InvalidFileStartPosition(start));
    }
    Ok(())
}

fn check_writable(read_only: bool) -> Result<(), FileServiceError> {
    if read_only {
        log::debug!("write refused: file is read-only");
        return Err(FileServiceError::FileAccessDenied);
    }
    Ok(())
}
