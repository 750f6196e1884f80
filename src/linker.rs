//! Replaces planned duplicates with hardlinks to their canonical file.
//!
//! Groups are processed one after another. The canonical file is never
//! touched; each duplicate, and every link to it, is deleted and a link to the
//! canonical file is created at the same path. The first failed delete or link aborts the
//! whole run and leaves groups that were already linked as they are.

use std::fs;
use std::io::Write;

use indicatif::HumanBytes;
use log::{info, warn};

use crate::error::DedupError;
use crate::planner::ConsolidationPlan;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSummary {
    pub groups_linked: usize,
    /// Groups whose canonical file was gone or no longer a regular file.
    pub groups_skipped: usize,
    pub files_linked: usize,
    pub bytes_freed: u64,
}

/// Links every planned duplicate, writing a trace line per step to `out`.
pub fn link_duplicates<W: Write>(
    plan: &ConsolidationPlan,
    out: &mut W,
) -> Result<LinkSummary, DedupError> {
    let mut summary = LinkSummary::default();

    for group in &plan.groups {
        let canonical = &group.canonical.path;
        match fs::symlink_metadata(canonical) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => {
                warn!(
                    "Skipping group: '{}' is no longer a regular file",
                    canonical.display()
                );
                summary.groups_skipped += 1;
                continue;
            }
            Err(source) => {
                warn!(
                    "Skipping group: {}",
                    DedupError::Stat {
                        path: canonical.clone(),
                        source,
                    }
                );
                summary.groups_skipped += 1;
                continue;
            }
        }

        for member in group.replace.iter().rev() {
            for path in member.paths().rev() {
                writeln!(out, "deleting {}", path.display())?;
                fs::remove_file(path).map_err(|source| DedupError::Remove {
                    path: path.to_path_buf(),
                    source,
                })?;

                writeln!(out, "linking {} to {}", canonical.display(), path.display())?;
                fs::hard_link(canonical, path).map_err(|source| DedupError::Link {
                    canonical: canonical.clone(),
                    path: path.to_path_buf(),
                    source,
                })?;

                summary.files_linked += 1;
            }
            summary.bytes_freed += member.size;
        }
        summary.groups_linked += 1;
    }

    info!(
        "Linked {} files in {} groups, freed {}",
        summary.files_linked,
        summary.groups_linked,
        HumanBytes(summary.bytes_freed)
    );

    Ok(summary)
}
