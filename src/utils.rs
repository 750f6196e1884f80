use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Renders `elapsed` for the closing log line, e.g. `1h 02m 03.000s`.
pub fn format_human_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);
    match (hours, minutes) {
        (0, 0) => format!("{seconds}.{millis:03}s"),
        (0, _) => format!("{minutes}m {seconds:02}.{millis:03}s"),
        _ => format!("{hours}h {minutes:02}m {seconds:02}.{millis:03}s"),
    }
}

/// Identity of the data behind a directory entry.
///
/// Two paths with equal identities are hardlinks to the same file. On Unix
/// this is the (device, inode) pair; other platforms have no identity and
/// every path is treated as a distinct file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }

    #[cfg(test)]
    pub(crate) fn with_inode(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }
}

/// A regular file seen during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub identity: Option<FileIdentity>,
    /// Other paths found to reach this same file, in walk order.
    pub links: Vec<PathBuf>,
}

impl FileRecord {
    /// Stats `path` without following symlinks.
    pub fn from_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let metadata = fs::symlink_metadata(&path)?;
        Ok(Self::from_metadata(path, &metadata))
    }

    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        Self {
            path,
            size: metadata.len(),
            identity: FileIdentity::from_metadata(metadata),
            links: Vec::new(),
        }
    }

    /// `path` followed by every known link to it.
    pub fn paths(&self) -> impl DoubleEndedIterator<Item = &Path> {
        std::iter::once(self.path.as_path()).chain(self.links.iter().map(PathBuf::as_path))
    }

    /// Whether this record is the same underlying file as `other`.
    ///
    /// Records without an identity are never the same file as anything.
    pub fn is_same_file(&self, other: &FileRecord) -> bool {
        matches!((self.identity, other.identity), (Some(a), Some(b)) if a == b)
    }
}
