use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use indicatif::{HumanBytes, HumanCount, ProgressBar};
use log::{debug, error, info};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::bucket::SizeBuckets;
use crate::error::DedupError;
use crate::utils::FileRecord;

const READ_BUFFER_SIZE: usize = 64 * 1024;

pub fn calculate_file_hash(file_path: &Path) -> Result<String, DedupError> {
    let read_error = |source| DedupError::OpenOrRead {
        path: file_path.to_path_buf(),
        source,
    };

    let mut file = fs::File::open(file_path).map_err(read_error)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0; READ_BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(read_error)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!("Hash calculated for '{}': {}", file_path.display(), hash);

    Ok(hash)
}

/// Files of one size whose contents hash identically, in walk order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumGroup {
    pub hash: String,
    pub size: u64,
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Default)]
pub struct Verification {
    /// Groups with at least two members, ordered by size then first member.
    pub groups: Vec<ChecksumGroup>,
    /// Files that could not be hashed and were left out.
    pub failures: Vec<DedupError>,
}

/// Hashes every candidate and regroups each size bucket by digest.
///
/// Members of a bucket are hashed in parallel on `pool`; the bucket is only
/// grouped once all of its hashes are in. A file that cannot be opened or
/// read is logged and dropped without affecting its siblings.
pub fn verify_checksums(
    buckets: SizeBuckets,
    pool: &ThreadPool,
    progress: &ProgressBar,
) -> Verification {
    info!(
        "Hashing {} candidate files ({})",
        HumanCount(buckets.candidate_count() as u64),
        HumanBytes(buckets.candidate_bytes())
    );

    let mut verification = Verification::default();

    for (size, bucket) in buckets {
        let hashed: Vec<(FileRecord, Result<String, DedupError>)> = pool.install(|| {
            bucket
                .into_members()
                .into_par_iter()
                .map(|record| {
                    let hash = calculate_file_hash(&record.path);
                    progress.inc(size);
                    (record, hash)
                })
                .collect()
        });

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<ChecksumGroup> = Vec::new();
        for (record, hash) in hashed {
            match hash {
                Ok(hash) => match index.get(&hash) {
                    Some(&i) => groups[i].files.push(record),
                    None => {
                        index.insert(hash.clone(), groups.len());
                        groups.push(ChecksumGroup {
                            hash,
                            size,
                            files: vec![record],
                        });
                    }
                },
                Err(err) => {
                    error!("{}", err);
                    verification.failures.push(err);
                }
            }
        }

        verification
            .groups
            .extend(groups.into_iter().filter(|group| group.files.len() > 1));
    }

    info!(
        "Checksum grouping complete: {} groups, {} unreadable files",
        verification.groups.len(),
        verification.failures.len()
    );

    verification
}
