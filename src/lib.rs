pub mod bucket;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod linker;
pub mod logging;
pub mod planner;
pub mod scanner;
pub mod utils;
pub mod walker;

pub use bucket::{Bucketer, SizeBuckets};
pub use cli::Cli;
pub use config::Config;
pub use duplicates::{
    Findings, ScanOptions, Stage, consolidate, find_duplicates, finish_run, print_results,
};
pub use error::DedupError;
pub use linker::{LinkSummary, link_duplicates};
pub use planner::{ConsolidationGroup, ConsolidationPlan, plan_consolidation};
pub use scanner::{ChecksumGroup, Verification, calculate_file_hash, verify_checksums};
pub use utils::{FileIdentity, FileRecord, format_human_elapsed};
pub use walker::{TreeWalker, WalkStats};
