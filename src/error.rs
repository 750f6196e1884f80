use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while finding and linking duplicates.
#[derive(Debug, Error)]
pub enum DedupError {
    /// A directory entry could not be read during the walk.
    #[error("failed to read directory entry: {0}")]
    Traversal(#[from] walkdir::Error),

    /// A candidate could not be stat'ed.
    #[error("failed to read metadata for '{path}': {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A candidate could not be opened or read while hashing.
    #[error("failed to hash '{path}': {source}")]
    OpenOrRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete '{path}': {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to link '{canonical}' to '{path}': {source}")]
    Link {
        canonical: PathBuf,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to build hashing thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to write report: {0}")]
    Report(#[from] io::Error),
}

impl DedupError {
    /// Whether this error must abort the run instead of skipping one path.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Remove { .. } | Self::Link { .. } | Self::ThreadPool(_) | Self::Report(_)
        )
    }
}
