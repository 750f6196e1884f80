//! Size bucketing with hardlink collapsing.
//!
//! Every bucket keeps one entry per underlying file. A path whose identity is
//! already represented in its bucket becomes an alias of that member instead
//! of a second entry, so hardlinks never reach the checksum stage twice.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::error::DedupError;
use crate::utils::{FileIdentity, FileRecord};

/// A path that resolved to a file already admitted as `member`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub path: PathBuf,
    pub member: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Member(usize),
    Alias(usize),
}

#[derive(Debug, Clone, Default)]
pub struct SizeBucket {
    members: Vec<FileRecord>,
    aliases: Vec<Alias>,
    identities: HashMap<FileIdentity, usize>,
}

impl SizeBucket {
    pub fn admit(&mut self, record: FileRecord) -> Admission {
        // Without an identity the best available key is the path itself.
        let existing = match record.identity {
            Some(identity) => self.identities.get(&identity).copied(),
            None => self.members.iter().position(|m| m.path == record.path),
        };
        if let Some(member) = existing {
            // Paths repeated through overlapping roots are not links.
            let target = &mut self.members[member];
            if target.path != record.path && !target.links.contains(&record.path) {
                target.links.push(record.path.clone());
            }
            self.aliases.push(Alias {
                path: record.path,
                member,
            });
            return Admission::Alias(member);
        }

        if let Some(identity) = record.identity {
            self.identities.insert(identity, self.members.len());
        }
        self.members.push(record);
        Admission::Member(self.members.len() - 1)
    }

    pub fn members(&self) -> &[FileRecord] {
        &self.members
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Consumes the bucket; each member carries its aliases in `links`.
    pub fn into_members(self) -> Vec<FileRecord> {
        self.members
    }
}

/// Buckets that survived filtering: at least two distinct files each.
#[derive(Debug, Clone, Default)]
pub struct SizeBuckets {
    buckets: BTreeMap<u64, SizeBucket>,
    stat_errors: u64,
}

impl SizeBuckets {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, size: u64) -> Option<&SizeBucket> {
        self.buckets.get(&size)
    }

    /// Buckets in ascending size order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &SizeBucket)> {
        self.buckets.iter().map(|(size, bucket)| (*size, bucket))
    }

    pub fn candidate_count(&self) -> usize {
        self.buckets.values().map(SizeBucket::len).sum()
    }

    pub fn candidate_bytes(&self) -> u64 {
        self.buckets
            .iter()
            .map(|(size, bucket)| size * bucket.len() as u64)
            .sum()
    }

    pub fn stat_errors(&self) -> u64 {
        self.stat_errors
    }
}

impl IntoIterator for SizeBuckets {
    type Item = (u64, SizeBucket);
    type IntoIter = std::collections::btree_map::IntoIter<u64, SizeBucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.into_iter()
    }
}

#[derive(Debug, Default)]
pub struct Bucketer {
    buckets: BTreeMap<u64, SizeBucket>,
    min_size: u64,
    stat_errors: u64,
    aliases: u64,
}

impl Bucketer {
    pub fn new(min_size: u64) -> Self {
        Self {
            min_size,
            ..Self::default()
        }
    }

    /// Stats `path` and files it by size. Unreadable paths are logged and
    /// skipped.
    pub fn add_path(&mut self, path: PathBuf) -> Option<Admission> {
        match FileRecord::from_path(&path) {
            Ok(record) => self.add_record(record),
            Err(source) => {
                self.stat_errors += 1;
                warn!("{}", DedupError::Stat { path, source });
                None
            }
        }
    }

    pub fn add_record(&mut self, record: FileRecord) -> Option<Admission> {
        if record.size < self.min_size {
            return None;
        }
        let path = record.path.clone();
        let admission = self.buckets.entry(record.size).or_default().admit(record);
        if let Admission::Alias(_) = admission {
            self.aliases += 1;
            debug!("'{}' is a hardlink to an already seen file", path.display());
        }
        Some(admission)
    }

    /// Drops every bucket that cannot hold a duplicate.
    pub fn finish(mut self) -> SizeBuckets {
        let total = self.buckets.len();
        self.buckets.retain(|_, bucket| bucket.len() > 1);
        info!(
            "Size grouping complete: {} sizes, {} candidate groups, {} hardlink aliases",
            total,
            self.buckets.len(),
            self.aliases
        );
        SizeBuckets {
            buckets: self.buckets,
            stat_errors: self.stat_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record(path: &str, size: u64, ino: Option<u64>) -> FileRecord {
        FileRecord {
            path: PathBuf::from(path),
            size,
            identity: ino.map(|ino| FileIdentity::with_inode(0, ino)),
            links: Vec::new(),
        }
    }

    #[test]
    fn test_distinct_sizes_never_share_a_bucket() {
        let mut bucketer = Bucketer::new(0);
        bucketer.add_record(record("a", 1, None));
        bucketer.add_record(record("b", 2, None));
        bucketer.add_record(record("c", 3, None));

        assert!(bucketer.finish().is_empty());
    }

    #[test]
    fn test_equal_sizes_form_a_bucket() {
        let mut bucketer = Bucketer::new(0);
        bucketer.add_record(record("a", 5, None));
        bucketer.add_record(record("b", 5, None));
        bucketer.add_record(record("c", 7, None));

        let buckets = bucketer.finish();
        assert_eq!(buckets.len(), 1);
        let bucket = buckets.get(5).unwrap();
        let paths: Vec<_> = bucket.members().iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(buckets.candidate_bytes(), 10);
    }

    #[test]
    fn test_repeated_identity_is_recorded_once() {
        let mut bucketer = Bucketer::new(0);
        bucketer.add_record(record("a", 5, Some(1)));
        bucketer.add_record(record("b", 5, Some(2)));
        // A third path to the first file must not re-enter the bucket even
        // though it differs from the second member.
        assert_eq!(
            bucketer.add_record(record("c", 5, Some(1))),
            Some(Admission::Alias(0))
        );
        assert_eq!(
            bucketer.add_record(record("d", 5, Some(2))),
            Some(Admission::Alias(1))
        );

        let buckets = bucketer.finish();
        let bucket = buckets.get(5).unwrap();
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket.aliases().len(), 2);
        assert_eq!(buckets.candidate_count(), 2);
    }

    #[test]
    fn test_members_carry_their_links() {
        let mut bucketer = Bucketer::new(0);
        bucketer.add_record(record("a", 5, Some(1)));
        bucketer.add_record(record("c", 5, Some(2)));
        bucketer.add_record(record("d", 5, Some(2)));
        // The same path reached twice is not a second link.
        bucketer.add_record(record("d", 5, Some(2)));
        bucketer.add_record(record("c", 5, Some(2)));

        let (_, bucket) = bucketer.finish().into_iter().next().unwrap();
        let members = bucket.into_members();
        assert!(members[0].links.is_empty());
        assert_eq!(members[1].path, PathBuf::from("c"));
        assert_eq!(members[1].links, vec![PathBuf::from("d")]);
    }

    #[test]
    fn test_same_path_without_identity_is_alias() {
        let mut bucketer = Bucketer::new(0);
        bucketer.add_record(record("a", 5, None));
        assert_eq!(
            bucketer.add_record(record("a", 5, None)),
            Some(Admission::Alias(0))
        );

        assert!(bucketer.finish().is_empty());
    }

    #[test]
    fn test_min_size_filters_small_files() {
        let mut bucketer = Bucketer::new(10);
        assert_eq!(bucketer.add_record(record("a", 5, None)), None);
        assert_eq!(bucketer.add_record(record("b", 5, None)), None);

        assert!(bucketer.finish().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_hardlinks_become_aliases() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let c = dir.path().join("c.txt");
        let d = dir.path().join("d.txt");
        fs::write(&a, b"hello").unwrap();
        fs::hard_link(&a, &b).unwrap();
        fs::write(&c, b"world").unwrap();
        fs::hard_link(&c, &d).unwrap();

        let mut bucketer = Bucketer::new(0);
        assert_eq!(bucketer.add_path(a.clone()), Some(Admission::Member(0)));
        assert_eq!(bucketer.add_path(b.clone()), Some(Admission::Alias(0)));
        assert_eq!(bucketer.add_path(c.clone()), Some(Admission::Member(1)));
        assert_eq!(bucketer.add_path(d.clone()), Some(Admission::Alias(1)));

        let buckets = bucketer.finish();
        let bucket = buckets.get(5).unwrap();
        assert_eq!(bucket.len(), 2);
        assert_eq!(
            bucket.aliases(),
            &[Alias { path: b, member: 0 }, Alias { path: d, member: 1 }]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_only_hardlinks_leave_no_candidates() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, b"hello").unwrap();
        fs::hard_link(&a, &b).unwrap();

        let mut bucketer = Bucketer::new(0);
        bucketer.add_path(a);
        bucketer.add_path(b);

        assert!(bucketer.finish().is_empty());
    }

    #[test]
    fn test_vanished_path_is_counted() {
        let dir = tempdir().unwrap();
        let mut bucketer = Bucketer::new(0);
        assert_eq!(bucketer.add_path(dir.path().join("gone.txt")), None);

        assert_eq!(bucketer.finish().stat_errors(), 1);
    }
}
