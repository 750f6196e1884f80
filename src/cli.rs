use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "link-file-dups", version)]
#[command(about = "Find duplicate files and replace them with hardlinks")]
pub struct Cli {
    /// Files or directories to scan; all must live on the same filesystem
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Replace duplicates with hardlinks (default: dry run, report only)
    #[arg(short, long)]
    pub apply: bool,

    /// Number of parallel threads for hashing (default: number of CPU cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Skip files smaller than this many bytes (default: 0)
    #[arg(short, long)]
    pub min_size: Option<u64>,

    /// TOML configuration file (default: ./link-file-dups.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not show progress bars
    #[arg(long)]
    pub no_progress: bool,
}
