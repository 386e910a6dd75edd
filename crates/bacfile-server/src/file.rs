use crate::error::FileServiceError;
use core::fmt;
use std::sync::Arc;

/// How a file object's contents are addressed. Fixed when the object is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FileAccessMethod {
    RecordAccess,
    StreamAccess,
}

/// Records returned by [`RecordAccessFile::read_records`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordRead {
    pub end_of_file: bool,
    pub records: Vec<Vec<u8>>,
}

/// Octets returned by [`StreamAccessFile::read_stream`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamRead {
    pub end_of_file: bool,
    pub data: Vec<u8>,
}

/// A file whose contents are a sequence of records.
///
/// Methods take `&self`; implementations synchronize their own state.
pub trait RecordAccessFile: Send + Sync {
    /// Number of records in the file.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_only(&self) -> bool;

    /// Reads up to `count` records starting at record `start`.
    fn read_records(&self, start: i32, count: u32) -> Result<RecordRead, FileServiceError>;

    /// Writes `records` starting at record `start` and returns the record
    /// index the write actually started at.
    ///
    /// `count` is the record count carried by the request. Read-only files are
    /// refused before this is called.
    fn write_records(
        &self,
        start: i32,
        count: u32,
        records: &[&[u8]],
    ) -> Result<i32, FileServiceError>;
}

/// A file whose contents are a flat octet string.
pub trait StreamAccessFile: Send + Sync {
    /// Number of octets in the file.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_only(&self) -> bool;

    /// Reads up to `count` octets starting at octet `start`.
    fn read_stream(&self, start: i32, count: u32) -> Result<StreamRead, FileServiceError>;

    /// Writes `data` at octet `start` and returns the position the write
    /// actually started at.
    fn write_stream(&self, start: i32, data: &[u8]) -> Result<i32, FileServiceError>;
}

/// A file object as held by an object table.
///
/// The variant is the object's access method, so it cannot change once the
/// object exists.
#[derive(Clone)]
pub enum FileObject {
    Record(Arc<dyn RecordAccessFile>),
    Stream(Arc<dyn StreamAccessFile>),
}

impl FileObject {
    pub fn record(file: impl RecordAccessFile + 'static) -> Self {
        Self::Record(Arc::new(file))
    }

    pub fn stream(file: impl StreamAccessFile + 'static) -> Self {
        Self::Stream(Arc::new(file))
    }

    pub const fn access_method(&self) -> FileAccessMethod {
        match self {
            Self::Record(_) => FileAccessMethod::RecordAccess,
            Self::Stream(_) => FileAccessMethod::StreamAccess,
        }
    }

    pub fn read_only(&self) -> bool {
        match self {
            Self::Record(file) => file.read_only(),
            Self::Stream(file) => file.read_only(),
        }
    }

    /// Records or octets, depending on the access method.
    pub fn len(&self) -> u64 {
        match self {
            Self::Record(file) => file.len(),
            Self::Stream(file) => file.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for FileObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileObject")
            .field("access_method", &self.access_method())
            .field("read_only", &self.read_only())
            .field("len", &self.len())
            .finish()
    }
}

/// Half-open window `[begin, end)` covered by a read of `count` units from
/// `start` in a file of `len` units. A start at the end yields an empty window.
pub(crate) fn read_window(
    start: i32,
    count: u32,
    len: usize,
) -> Result<(usize, usize), FileServiceError> {
    let begin = usize::try_from(start)
        .ok()
        .filter(|begin| *begin <= len)
        .ok_or(FileServiceError::InvalidFileStartPosition(start))?;
    let end = begin.saturating_add(count as usize).min(len);
    Ok((begin, end))
}

/// Where a write to a file of `len` units lands: `-1` appends, `0..=len`
/// overwrites from that point and may extend the file.
pub(crate) fn write_offset(start: i32, len: usize) -> Result<usize, FileServiceError> {
    match start {
        -1 => Ok(len),
        s => usize::try_from(s)
            .ok()
            .filter(|offset| *offset <= len)
            .ok_or(FileServiceError::InvalidFileStartPosition(s)),
    }
}

/// Reports a write offset back in the ack's signed start field.
pub(crate) fn ack_start(offset: usize, requested: i32) -> Result<i32, FileServiceError> {
    i32::try_from(offset).map_err(|_| FileServiceError::InvalidFileStartPosition(requested))
}

#[cfg(test)]
mod tests {
    use super::{read_window, write_offset, FileAccessMethod, FileObject};
    use crate::error::FileServiceError;
    use crate::memory::{MemoryRecordFile, MemoryStreamFile};

    #[test]
    fn access_method_follows_variant() {
        let record = FileObject::record(MemoryRecordFile::new(vec![vec![1], vec![2]]));
        assert_eq!(record.access_method(), FileAccessMethod::RecordAccess);
        assert_eq!(record.len(), 2);
        assert!(!record.read_only());

        let stream = FileObject::stream(MemoryStreamFile::new_read_only(vec![0; 5]));
        assert_eq!(stream.access_method(), FileAccessMethod::StreamAccess);
        assert_eq!(stream.len(), 5);
        assert!(stream.read_only());
    }

    #[test]
    fn debug_omits_contents() {
        let stream = FileObject::stream(MemoryStreamFile::new(Vec::new()));
        let text = format!("{stream:?}");
        assert!(text.contains("StreamAccess"));
        assert!(text.contains("len: 0"));
        assert!(stream.is_empty());
    }

    #[test]
    fn read_window_clamps_to_len() {
        assert_eq!(read_window(2, 10, 5).unwrap(), (2, 5));
        assert_eq!(read_window(0, 3, 5).unwrap(), (0, 3));
        assert_eq!(read_window(5, 1, 5).unwrap(), (5, 5));
        assert!(matches!(
            read_window(6, 1, 5),
            Err(FileServiceError::InvalidFileStartPosition(6))
        ));
        assert!(matches!(
            read_window(-1, 1, 5),
            Err(FileServiceError::InvalidFileStartPosition(-1))
        ));
    }

    #[test]
    fn write_offset_appends_or_stays_in_bounds() {
        assert_eq!(write_offset(-1, 4).unwrap(), 4);
        assert_eq!(write_offset(0, 4).unwrap(), 0);
        assert_eq!(write_offset(4, 4).unwrap(), 4);
        assert!(matches!(
            write_offset(5, 4),
            Err(FileServiceError::InvalidFileStartPosition(5))
        ));
        assert!(matches!(
            write_offset(-2, 4),
            Err(FileServiceError::InvalidFileStartPosition(-2))
        ));
    }
}
