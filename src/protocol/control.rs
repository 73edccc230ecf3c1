//! Control lines and the file metadata they carry
// (c) 2024 Ross Younger
//!
//! A _control line_ is a newline-terminated ASCII line carrying metadata rather than file content.
//! The sink protocol uses two of them per file:
//! * `T<mtime> 0 <mtime> 0\n` (timestamp)
//! * `C0644 <length> <name> \n` (header)

use std::{
    fs::Metadata,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

/// The file mode sent in every header. No mode or ownership negotiation is attempted.
pub const FILE_MODE: &str = "0644";

/// Resolved view of one local file, taken at the moment its transfer begins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUnit {
    /// Content length in bytes
    pub length: u64,
    /// Modification time, in whole seconds since the epoch (sub-second precision discarded)
    pub mtime: i64,
    /// Base name of the file, as the sink will create it
    pub name: String,
}

/// Why a local file could not be turned into a [`FileUnit`]
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    /// Recursion is not supported
    #[error("is a directory")]
    Directory,
    /// The path has no final component (e.g. `..` or `/`)
    #[error("has no file name")]
    NoName,
    /// The name would corrupt the control line
    #[error("file name contains a newline")]
    NewlineInName,
    /// The platform could not report a modification time
    #[error("cannot read modification time: {0}")]
    Time(#[source] std::io::Error),
}

impl FileUnit {
    /// Builds a unit from a path and the metadata of the (already opened) file
    pub fn new(path: &Path, meta: &Metadata) -> Result<Self, UnitError> {
        if meta.is_dir() {
            return Err(UnitError::Directory);
        }
        let name = path
            .file_name()
            .ok_or(UnitError::NoName)?
            .to_string_lossy()
            .to_string();
        if name.contains('\n') {
            return Err(UnitError::NewlineInName);
        }
        let modified = meta.modified().map_err(UnitError::Time)?;
        Ok(Self {
            length: meta.len(),
            mtime: whole_seconds(modified),
            name,
        })
    }

    /// `T<mtime> 0 <mtime> 0\n`
    #[must_use]
    pub fn timestamp_line(&self) -> String {
        format!("T{m} 0 {m} 0\n", m = self.mtime)
    }

    /// `C0644 <length> <name> \n`
    #[must_use]
    pub fn header_line(&self) -> String {
        format!("C{FILE_MODE} {} {} \n", self.length, self.name)
    }
}

/// Seconds since the epoch, truncated towards zero (so times before 1970 come out negative)
fn whole_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
    }
}

#[cfg(test)]
mod test {
    use super::{whole_seconds, FileUnit, UnitError};
    use crate::util::make_test_tempfile;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn control_lines() {
        let unit = FileUnit {
            length: 1234,
            mtime: 1_700_000_000,
            name: "a.txt".into(),
        };
        assert_eq!(unit.timestamp_line(), "T1700000000 0 1700000000 0\n");
        assert_eq!(unit.header_line(), "C0644 1234 a.txt \n");
    }

    #[test]
    fn zero_length_header() {
        let unit = FileUnit {
            length: 0,
            mtime: 0,
            name: "empty".into(),
        };
        assert_eq!(unit.header_line(), "C0644 0 empty \n");
    }

    #[test]
    fn subsecond_precision_is_dropped() {
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_999);
        assert_eq!(whole_seconds(t), 1_700_000_000);
        let before = UNIX_EPOCH - Duration::from_millis(1500);
        assert_eq!(whole_seconds(before), -1);
    }

    #[test]
    fn from_real_file() {
        let (path, _dir) = make_test_tempfile("hello world", "greeting.txt");
        let meta = std::fs::metadata(&path).unwrap();
        let unit = FileUnit::new(&path, &meta).unwrap();
        assert_eq!(unit.length, 11);
        assert_eq!(unit.name, "greeting.txt");
        assert!(unit.mtime > 0);
    }

    #[test]
    fn directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let meta = std::fs::metadata(dir.path()).unwrap();
        let err = FileUnit::new(dir.path(), &meta).unwrap_err();
        assert!(matches!(err, UnitError::Directory));
    }
}
