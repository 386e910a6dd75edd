//! JSON manifest listing the file objects a `bacfile-server` exposes.
//!
//! ```json
//! {
//!   "files": [
//!     { "instance": 1, "access": "stream", "path": "trend.csv" },
//!     { "instance": 2, "access": "record", "read_only": true,
//!       "records": ["first", "second"] },
//!     { "instance": 3, "access": "stream", "data": "hello" }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use bacfile_core::types::ObjectId;
use bacfile_server::{
    DiskStreamFile, FileAccessMethod, FileObject, FileServiceError, MemoryRecordFile,
    MemoryStreamFile, ObjectTable,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot read manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("file instance {0} is listed more than once")]
    DuplicateInstance(u32),
    #[error("file instance {0} exceeds the object instance range")]
    InstanceOutOfRange(u32),
    #[error("file instance {0}: {1}")]
    InvalidEntry(u32, &'static str),
    #[error("file instance {instance}: {source}")]
    Open {
        instance: u32,
        #[source]
        source: FileServiceError,
    },
}

/// Access method as written in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessArg {
    Record,
    Stream,
}

impl From<AccessArg> for FileAccessMethod {
    fn from(arg: AccessArg) -> Self {
        match arg {
            AccessArg::Record => Self::RecordAccess,
            AccessArg::Stream => Self::StreamAccess,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileEntry {
    pub instance: u32,
    pub access: AccessArg,
    #[serde(default)]
    pub read_only: bool,
    /// Backing file for a disk-stored stream file.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Initial records of an in-memory record file.
    #[serde(default)]
    pub records: Vec<String>,
    /// Initial contents of an in-memory stream file.
    #[serde(default)]
    pub data: Option<String>,
}

impl FileEntry {
    fn build(&self, base_dir: &Path) -> Result<FileObject, ManifestError> {
        match FileAccessMethod::from(self.access) {
            FileAccessMethod::RecordAccess => {
                if self.path.is_some() || self.data.is_some() {
                    return Err(ManifestError::InvalidEntry(
                        self.instance,
                        "record files take `records` only",
                    ));
                }
                let records = self.records.iter().map(|r| r.as_bytes().to_vec()).collect();
                Ok(FileObject::record(if self.read_only {
                    MemoryRecordFile::new_read_only(records)
                } else {
                    MemoryRecordFile::new(records)
                }))
            }
            FileAccessMethod::StreamAccess => {
                if !self.records.is_empty() {
                    return Err(ManifestError::InvalidEntry(
                        self.instance,
                        "stream files take `path` or `data`, not `records`",
                    ));
                }
                match (&self.path, &self.data) {
                    (Some(path), None) => {
                        let path = base_dir.join(path);
                        let opened = if self.read_only {
                            DiskStreamFile::open_read_only(&path)
                        } else {
                            DiskStreamFile::open(&path)
                        };
                        let file = opened.map_err(|source| ManifestError::Open {
                            instance: self.instance,
                            source,
                        })?;
                        Ok(FileObject::stream(file))
                    }
                    (None, data) => {
                        let data = data.as_deref().unwrap_or_default().as_bytes().to_vec();
                        Ok(FileObject::stream(if self.read_only {
                            MemoryStreamFile::new_read_only(data)
                        } else {
                            MemoryStreamFile::new(data)
                        }))
                    }
                    (Some(_), Some(_)) => Err(ManifestError::InvalidEntry(
                        self.instance,
                        "use either `path` or `data`, not both",
                    )),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub files: Vec<FileEntry>,
}

impl Manifest {
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads the manifest at `path` and builds its object table.
    pub fn load_table(path: &Path) -> Result<ObjectTable, ManifestError> {
        let manifest = Self::from_json(&std::fs::read_to_string(path)?)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.build_table(base_dir)
    }

    pub fn build_table(&self, base_dir: &Path) -> Result<ObjectTable, ManifestError> {
        let table = ObjectTable::new();
        let mut seen = HashSet::new();
        for entry in &self.files {
            if entry.instance > ObjectId::MAX_INSTANCE {
                return Err(ManifestError::InstanceOutOfRange(entry.instance));
            }
            if !seen.insert(entry.instance) {
                return Err(ManifestError::DuplicateInstance(entry.instance));
            }
            table.insert(ObjectId::file(entry.instance), entry.build(base_dir)?);
        }
        log::info!("manifest: {} file object(s) loaded", table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessArg, Manifest, ManifestError};
    use bacfile_core::types::ObjectId;
    use bacfile_server::{FileAccessMethod, ObjectResolver};
    use tempfile::TempDir;

    #[test]
    fn parses_entries_with_defaults() {
        let manifest = Manifest::from_json(
            r#"{"files": [
                {"instance": 1, "access": "stream", "data": "abc"},
                {"instance": 2, "access": "record", "read_only": true, "records": ["x", "yz"]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(manifest.files.len(), 2);
        assert_eq!(manifest.files[0].access, AccessArg::Stream);
        assert!(!manifest.files[0].read_only);
        assert!(manifest.files[1].read_only);

        let table = manifest.build_table(std::path::Path::new(".")).unwrap();
        let stream = table.resolve(ObjectId::file(1)).unwrap();
        assert_eq!(stream.access_method(), FileAccessMethod::StreamAccess);
        assert_eq!(stream.len(), 3);
        let record = table.resolve(ObjectId::file(2)).unwrap();
        assert_eq!(record.access_method(), FileAccessMethod::RecordAccess);
        assert_eq!(record.len(), 2);
        assert!(record.read_only());
    }

    #[test]
    fn disk_paths_are_relative_to_the_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("log.bin"), b"0123").unwrap();
        let manifest_path = dir.path().join("files.json");
        std::fs::write(
            &manifest_path,
            r#"{"files": [{"instance": 7, "access": "stream", "path": "log.bin"}]}"#,
        )
        .unwrap();

        let table = Manifest::load_table(&manifest_path).unwrap();
        assert_eq!(table.resolve(ObjectId::file(7)).unwrap().len(), 4);
    }

    #[test]
    fn rejects_duplicates_and_mixed_sources() {
        let dup = Manifest::from_json(
            r#"{"files": [{"instance": 1, "access": "stream"}, {"instance": 1, "access": "record"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            dup.build_table(std::path::Path::new(".")),
            Err(ManifestError::DuplicateInstance(1))
        ));

        let mixed = Manifest::from_json(
            r#"{"files": [{"instance": 4, "access": "record", "data": "nope"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            mixed.build_table(std::path::Path::new(".")),
            Err(ManifestError::InvalidEntry(4, _))
        ));
    }

    #[test]
    fn unknown_access_method_is_an_error() {
        let err = Manifest::from_json(r#"{"files": [{"instance": 1, "access": "tape"}]}"#)
            .unwrap_err();
        assert!(matches!(err, ManifestError::Json(_)));
    }
}
