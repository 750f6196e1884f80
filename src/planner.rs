//! Decides which duplicates still need linking.
//!
//! The first file of each checksum group is kept as the canonical copy. Every
//! path of every other member, its hardlinks included, is re-stat'ed. A path
//! that already shares the canonical file's identity needs nothing done. The
//! rest are scheduled for replacement, and a member's size counts once towards
//! the reclaimable total, since its data is only released when no path to it
//! is left.

use std::path::Path;

use indicatif::HumanBytes;
use log::{debug, info, warn};

use crate::error::DedupError;
use crate::scanner::ChecksumGroup;
use crate::utils::FileRecord;

/// One canonical file and the duplicates to be replaced by links to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationGroup {
    pub hash: String,
    pub canonical: FileRecord,
    /// Non-empty, in the checksum group's order. Each entry's `links` are
    /// replaced along with it.
    pub replace: Vec<FileRecord>,
}

impl ConsolidationGroup {
    pub fn reclaimable(&self) -> u64 {
        self.replace.iter().map(|record| record.size).sum()
    }

    /// Canonical path first, then every path to be replaced.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.canonical.path.as_path())
            .chain(self.replace.iter().flat_map(|record| record.paths()))
    }

    pub fn file_count(&self) -> usize {
        self.paths().count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidationPlan {
    pub groups: Vec<ConsolidationGroup>,
    /// Members found to be hardlinked to their canonical file already.
    pub already_linked: usize,
    pub reclaimable: u64,
}

impl ConsolidationPlan {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Re-stats `path`, falling back to the size the walk saw if that fails.
fn refresh(path: &Path, size: u64) -> FileRecord {
    match FileRecord::from_path(path) {
        Ok(live) => live,
        Err(source) => {
            warn!(
                "{}",
                DedupError::Stat {
                    path: path.to_path_buf(),
                    source,
                }
            );
            FileRecord {
                path: path.to_path_buf(),
                size,
                identity: None,
                links: Vec::new(),
            }
        }
    }
}

pub fn plan_consolidation(groups: Vec<ChecksumGroup>) -> ConsolidationPlan {
    let mut plan = ConsolidationPlan::default();

    for group in groups {
        let mut files = group.files.into_iter();
        let Some(canonical) = files.next() else {
            continue;
        };
        let canonical = FileRecord {
            links: canonical.links,
            ..refresh(&canonical.path, canonical.size)
        };

        let mut replace = Vec::new();
        for member in files.rev() {
            let mut pending = Vec::new();
            for path in member.paths() {
                let live = refresh(path, member.size);
                if live.is_same_file(&canonical) {
                    debug!(
                        "'{}' is already linked to '{}'",
                        path.display(),
                        canonical.path.display()
                    );
                    plan.already_linked += 1;
                } else {
                    pending.push(live);
                }
            }

            let mut pending = pending.into_iter();
            let Some(mut head) = pending.next() else {
                continue;
            };
            head.links = pending.map(|record| record.path).collect();
            plan.reclaimable += head.size;
            replace.push(head);
        }

        if replace.is_empty() {
            continue;
        }
        replace.reverse();
        plan.groups.push(ConsolidationGroup {
            hash: group.hash,
            canonical,
            replace,
        });
    }

    info!(
        "Planning complete: {} groups to link, {} already linked, {} reclaimable",
        plan.groups.len(),
        plan.already_linked,
        HumanBytes(plan.reclaimable)
    );

    plan
}
