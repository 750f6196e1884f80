//! Recursive enumeration of regular files under a set of roots.
//!
//! Entries are visited sorted by file name so runs over the same tree are
//! reproducible. Symlinks are never followed, including symlinked roots, and
//! anything that is not a regular file is skipped silently. A failure on one
//! entry is logged and counted; the walk carries on with its siblings.

use std::path::PathBuf;

use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::DedupError;

/// Counters accumulated while walking.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    pub files: u64,
    pub dirs: u64,
    /// Symlinks, sockets, devices and other non-regular entries.
    pub skipped: u64,
    pub errors: u64,
}

pub struct TreeWalker {
    roots: Vec<PathBuf>,
    stats: WalkStats,
}

impl TreeWalker {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            stats: WalkStats::default(),
        }
    }

    /// Lazily yields every regular file reachable from the roots.
    pub fn files(&mut self) -> impl Iterator<Item = PathBuf> + '_ {
        let roots = &self.roots;
        let stats = &mut self.stats;
        roots
            .iter()
            .flat_map(|root| {
                WalkDir::new(root)
                    .follow_links(false)
                    .follow_root_links(false)
                    .sort_by_file_name()
            })
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_file() {
                        stats.files += 1;
                        debug!("Found file: '{}'", entry.path().display());
                        Some(entry.into_path())
                    } else {
                        if file_type.is_dir() {
                            stats.dirs += 1;
                        } else {
                            stats.skipped += 1;
                        }
                        None
                    }
                }
                Err(err) => {
                    stats.errors += 1;
                    warn!("{}", DedupError::Traversal(err));
                    None
                }
            })
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_walk_finds_nested_files_in_order() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join("sub/deeper/c.txt"), b"c").unwrap();

        let mut walker = TreeWalker::new([dir.path()]);
        let files: Vec<_> = walker.files().collect();

        assert_eq!(
            files,
            vec![
                dir.path().join("a.txt"),
                dir.path().join("b.txt"),
                dir.path().join("sub/deeper/c.txt"),
            ]
        );
        let stats = walker.stats();
        assert_eq!(stats.files, 3);
        assert_eq!(stats.dirs, 3);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn test_file_root_is_yielded() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("only.txt");
        fs::write(&file, b"x").unwrap();

        let mut walker = TreeWalker::new([&file]);
        assert_eq!(walker.files().collect::<Vec<_>>(), vec![file]);
    }

    #[test]
    fn test_missing_root_does_not_stop_walk() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let mut walker = TreeWalker::new([dir.path().join("missing"), dir.path().to_path_buf()]);
        let files: Vec<_> = walker.files().collect();

        assert_eq!(files, vec![dir.path().join("a.txt")]);
        assert_eq!(walker.stats().errors, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a.txt");
        fs::write(&target, b"a").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link.txt")).unwrap();

        let mut walker = TreeWalker::new([dir.path()]);
        let files: Vec<_> = walker.files().collect();

        assert_eq!(files, vec![target]);
        assert_eq!(walker.stats().skipped, 1);
    }
}
