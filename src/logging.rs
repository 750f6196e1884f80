use log::{LevelFilter, SetLoggerError, debug};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Sends log records to stderr: info by default, debug when `verbose`.
///
/// Can only succeed once per process.
pub fn init_logging(verbose: bool) -> Result<(), SetLoggerError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = ConfigBuilder::new();
    let local_time = builder.set_time_offset_to_local().is_ok();
    builder
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off);

    TermLogger::init(
        level,
        builder.build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;
    if !local_time {
        debug!("Local time offset unavailable, log timestamps are in UTC");
    }
    Ok(())
}
