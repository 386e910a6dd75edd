//! Stream-access file stored in the local filesystem.

use crate::error::FileServiceError;
use crate::file::{ack_start, read_window, write_offset, StreamAccessFile, StreamRead};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Debug)]
struct DiskState {
    file: File,
    len: u64,
}

/// Octets of a filesystem file served as a stream-access file object.
///
/// The handle is opened once and held for the life of the object; the length
/// is tracked alongside it so [`StreamAccessFile::len`] never touches the disk.
#[derive(Debug)]
pub struct DiskStreamFile {
    path: PathBuf,
    state: Mutex<DiskState>,
    read_only: bool,
}

impl DiskStreamFile {
    /// Opens `path` for reading and writing, creating it if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileServiceError> {
        Self::open_with(path.as_ref(), false)
    }

    /// Opens an existing `path` for reading only.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, FileServiceError> {
        Self::open_with(path.as_ref(), true)
    }

    fn open_with(path: &Path, read_only: bool) -> Result<Self, FileServiceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(!read_only)
            .create(!read_only)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();
        log::debug!(
            "disk file {} opened ({len} octets, read_only={read_only})",
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(DiskState { file, len }),
            read_only,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StreamAccessFile for DiskStreamFile {
    fn len(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn read_stream(&self, start: i32, count: u32) -> Result<StreamRead, FileServiceError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let len = usize::try_from(state.len).unwrap_or(usize::MAX);
        let (begin, end) = read_window(start, count, len)?;

        let mut data = vec![0u8; end - begin];
        state.file.seek(SeekFrom::Start(begin as u64))?;
        state.file.read_exact(&mut data)?;
        Ok(StreamRead {
            end_of_file: end == len,
            data,
        })
    }

    fn write_stream(&self, start: i32, bytes: &[u8]) -> Result<i32, FileServiceError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let len = usize::try_from(state.len).unwrap_or(usize::MAX);
        let offset = write_offset(start, len)?;
        let actual = ack_start(offset, start)?;

        let DiskState { file, len: tracked } = &mut *state;
        if let Err(e) = write_at(file, tracked, offset as u64, bytes) {
            log::debug!(
                "disk file {}: write at {actual} failed, length now {}: {e}",
                self.path.display(),
                state.len
            );
            return Err(e.into());
        }
        log::debug!(
            "disk file {}: wrote {} octet(s) at {actual}",
            self.path.display(),
            bytes.len()
        );
        Ok(actual)
    }
}

/// Writes `bytes` at `offset` and keeps `len` in step with the handle.
///
/// A write that fails partway may still have extended the file, so on error
/// the length is taken from wherever the handle stopped.
fn write_at<H: Write + Seek>(
    handle: &mut H,
    len: &mut u64,
    offset: u64,
    bytes: &[u8],
) -> io::Result<()> {
    handle.seek(SeekFrom::Start(offset))?;
    match handle.write_all(bytes).and_then(|()| handle.flush()) {
        Ok(()) => {
            *len = (*len).max(offset + bytes.len() as u64);
            Ok(())
        }
        Err(e) => {
            if let Ok(reached) = handle.stream_position() {
                *len = (*len).max(reached);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{write_at, DiskStreamFile};
    use crate::error::FileServiceError;
    use crate::file::StreamAccessFile;
    use bacfile_core::types::ErrorCode;
    use std::io::{self, Cursor, Seek, SeekFrom, Write};
    use tempfile::TempDir;

    /// Storage that accepts `capacity` octets and then fails like a full disk.
    struct ShortStorage {
        inner: Cursor<Vec<u8>>,
        capacity: u64,
    }

    impl Write for ShortStorage {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.capacity.saturating_sub(self.inner.position());
            if room == 0 {
                return Err(io::Error::other("file too large"));
            }
            let n = buf.len().min(room as usize);
            self.inner.write(&buf[..n])
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for ShortStorage {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn reads_existing_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let file = DiskStreamFile::open_read_only(&path).unwrap();
        assert_eq!(file.len(), 10);
        assert!(file.read_only());

        let read = file.read_stream(4, 3).unwrap();
        assert_eq!(read.data, b"456");
        assert!(!read.end_of_file);

        let read = file.read_stream(8, 50).unwrap();
        assert_eq!(read.data, b"89");
        assert!(read.end_of_file);
    }

    #[test]
    fn writes_reach_the_filesystem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.bin");

        let file = DiskStreamFile::open(&path).unwrap();
        assert_eq!(file.len(), 0);
        assert_eq!(file.write_stream(0, b"abcd").unwrap(), 0);
        assert_eq!(file.write_stream(2, b"XYZ").unwrap(), 2);
        assert_eq!(file.write_stream(-1, b"!").unwrap(), 5);
        assert_eq!(file.len(), 6);
        drop(file);

        assert_eq!(std::fs::read(&path).unwrap(), b"abXYZ!");
    }

    #[test]
    fn write_beyond_end_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = DiskStreamFile::open(dir.path().join("gap.bin")).unwrap();
        let err = file.write_stream(3, b"x").unwrap_err();
        assert!(matches!(err, FileServiceError::InvalidFileStartPosition(3)));
    }

    #[test]
    fn missing_read_only_file_is_operational_problem() {
        let dir = TempDir::new().unwrap();
        let err = DiskStreamFile::open_read_only(dir.path().join("absent.bin")).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::OperationalProblem);
    }

    #[test]
    fn failed_write_keeps_length_at_what_reached_storage() {
        let mut storage = ShortStorage {
            inner: Cursor::new(Vec::new()),
            capacity: 1024,
        };
        let mut len = 0;

        let err = write_at(&mut storage, &mut len, 0, &[0xAA; 1400]).unwrap_err();
        assert_eq!(err.to_string(), "file too large");
        assert_eq!(len, 1024);
        assert_eq!(storage.inner.get_ref().len() as u64, len);

        // The next append must start after the partial data, not over it.
        let end = len;
        storage.capacity = 2048;
        write_at(&mut storage, &mut len, end, b"tail").unwrap();
        assert_eq!(len, 1028);
        assert_eq!(&storage.inner.get_ref()[1024..], b"tail");
        assert_eq!(storage.inner.get_ref()[1023], 0xAA);
    }

    #[test]
    fn failed_overwrite_inside_the_file_keeps_length() {
        let mut storage = ShortStorage {
            inner: Cursor::new(vec![1; 10]),
            capacity: 6,
        };
        let mut len = 10;

        write_at(&mut storage, &mut len, 4, &[2; 5]).unwrap_err();
        assert_eq!(len, 10);
        assert_eq!(storage.inner.get_ref()[4..6], [2, 2]);
    }
}
