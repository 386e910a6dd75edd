//! File objects kept entirely in memory.

use crate::error::FileServiceError;
use crate::file::{
    ack_start, read_window, write_offset, RecordAccessFile, RecordRead, StreamAccessFile,
    StreamRead,
};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Record-access file backed by a `Vec` of records.
#[derive(Debug, Default)]
pub struct MemoryRecordFile {
    records: Mutex<Vec<Vec<u8>>>,
    read_only: bool,
}

impl MemoryRecordFile {
    pub fn new(records: Vec<Vec<u8>>) -> Self {
        Self {
            records: Mutex::new(records),
            read_only: false,
        }
    }

    pub fn new_read_only(records: Vec<Vec<u8>>) -> Self {
        Self {
            records: Mutex::new(records),
            read_only: true,
        }
    }

    /// Copy of the current records.
    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        lock(&self.records).clone()
    }
}

impl RecordAccessFile for MemoryRecordFile {
    fn len(&self) -> u64 {
        lock(&self.records).len() as u64
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn read_records(&self, start: i32, count: u32) -> Result<RecordRead, FileServiceError> {
        let records = lock(&self.records);
        let (begin, end) = read_window(start, count, records.len())?;
        Ok(RecordRead {
            end_of_file: end == records.len(),
            records: records[begin..end].to_vec(),
        })
    }

    /// Every record in `records` is written; `count` is only checked for
    /// agreement and logged when it differs.
    fn write_records(
        &self,
        start: i32,
        count: u32,
        records: &[&[u8]],
    ) -> Result<i32, FileServiceError> {
        if usize::try_from(count).map_or(true, |count| count != records.len()) {
            log::debug!(
                "record file: record count {count} disagrees with {} record(s) supplied",
                records.len()
            );
        }
        let mut stored = lock(&self.records);
        let offset = write_offset(start, stored.len())?;
        let actual = ack_start(offset, start)?;
        for (index, record) in (offset..).zip(records) {
            match stored.get_mut(index) {
                Some(slot) => *slot = record.to_vec(),
                None => stored.push(record.to_vec()),
            }
        }
        log::debug!(
            "record file: wrote {} record(s) at {actual}, now {} record(s)",
            records.len(),
            stored.len()
        );
        Ok(actual)
    }
}

/// Stream-access file backed by a `Vec<u8>`.
#[derive(Debug, Default)]
pub struct MemoryStreamFile {
    data: Mutex<Vec<u8>>,
    read_only: bool,
}

impl MemoryStreamFile {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Mutex::new(data),
            read_only: false,
        }
    }

    pub fn new_read_only(data: Vec<u8>) -> Self {
        Self {
            data: Mutex::new(data),
            read_only: true,
        }
    }

    pub fn snapshot(&self) -> Vec<u8> {
        lock(&self.data).clone()
    }
}

impl StreamAccessFile for MemoryStreamFile {
    fn len(&self) -> u64 {
        lock(&self.data).len() as u64
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn read_stream(&self, start: i32, count: u32) -> Result<StreamRead, FileServiceError> {
        let data = lock(&self.data);
        let (begin, end) = read_window(start, count, data.len())?;
        Ok(StreamRead {
            end_of_file: end == data.len(),
            data: data[begin..end].to_vec(),
        })
    }

    fn write_stream(&self, start: i32, bytes: &[u8]) -> Result<i32, FileServiceError> {
        let mut data = lock(&self.data);
        let offset = write_offset(start, data.len())?;
        let actual = ack_start(offset, start)?;
        let end = offset + bytes.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(bytes);
        log::debug!(
            "stream file: wrote {} octet(s) at {actual}, now {} octet(s)",
            bytes.len(),
            data.len()
        );
        Ok(actual)
    }
}
