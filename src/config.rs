use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::Cli;
use crate::duplicates::ScanOptions;

/// Looked up in the current directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = concat!(env!("CARGO_PKG_NAME"), ".toml");

/// Settings read from a TOML file, then overridden by command-line flags.
///
/// ```toml
/// apply = false
/// threads = 4
/// min_size = 1024
/// verbose = false
/// progress = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Replace duplicates with hardlinks instead of only reporting them.
    pub apply: bool,
    /// Hashing threads; defaults to the number of CPU cores.
    pub threads: Option<usize>,
    /// Files smaller than this many bytes are ignored.
    pub min_size: u64,
    pub verbose: bool,
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apply: false,
            threads: None,
            min_size: 0,
            verbose: false,
            progress: true,
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    /// Loads `explicit` if given, else the default file if it exists, else
    /// the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE_NAME);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: '{}'", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config file: '{}'", path.display()))
    }

    /// Applies the flags given on the command line on top of this config.
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if cli.apply {
            self.apply = true;
        }
        if let Some(threads) = cli.threads {
            self.threads = Some(threads);
        }
        if let Some(min_size) = cli.min_size {
            self.min_size = min_size;
        }
        if cli.verbose {
            self.verbose = true;
        }
        if cli.no_progress {
            self.progress = false;
        }
        self
    }

    pub fn scan_options(&self) -> ScanOptions {
        let threads = self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        ScanOptions {
            threads,
            min_size: self.min_size,
            show_progress: self.progress,
        }
    }
}
