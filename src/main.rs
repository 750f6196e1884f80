use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log::{debug, info};

use link_file_dups::logging::init_logging;
use link_file_dups::{Cli, Config, find_duplicates, finish_run, format_human_elapsed, print_results};

fn run(cli: Cli) -> Result<()> {
    let start_time = Instant::now();

    let config = Config::load(cli.config.as_deref())?.with_cli(&cli);
    init_logging(config.verbose).context("Failed to initialize logging")?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    debug!("Command line arguments: {:?}", cli);
    debug!("Effective configuration: {:?}", config);

    let mut findings = find_duplicates(&cli.paths, &config.scan_options())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_results(&findings, &mut out)?;

    finish_run(&mut findings, config.apply, &mut out)?;
    out.flush()?;

    info!(
        "Program completed successfully in {}",
        format_human_elapsed(start_time.elapsed())
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}
