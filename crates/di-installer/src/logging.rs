use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use di_platform::AppPaths;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

/// Each run appends to the same file.
fn open_log_file(log_path: &Path) -> io::Result<File> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(log_path)
}

/// Drop the older half of the log once it grows past `max_log_size`.
fn trim_log_file_if_oversized(log_path: &Path, max_log_size: u64) {
    if let Ok(metadata) = std::fs::metadata(log_path)
        && metadata.len() > max_log_size
        && let Ok(contents) = std::fs::read(log_path)
    {
        let half = contents.len() / 2;
        let keep_from = contents[half..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(half, |pos| half + pos + 1);
        let _ = std::fs::write(log_path, &contents[keep_from..]);
    }
}

/// Log to `<data dir>/di-installer.log`, and to the terminal with `--debug`.
///
/// Progress shown to the user goes through the console, not through here.
pub fn init_logging(debug_enabled: bool, max_log_size: u64) {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("di_")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    if let Ok(paths) = AppPaths::new() {
        let _ = paths.ensure_dirs();
        let log_path = paths.log_file();
        trim_log_file_if_oversized(&log_path, max_log_size);

        if let Ok(file) = open_log_file(&log_path) {
            loggers.push(WriteLogger::new(LevelFilter::Debug, config.clone(), file));
        }
    }

    if debug_enabled {
        loggers.push(TermLogger::new(
            LevelFilter::Debug,
            config,
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }

    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }

    set_log_level(debug_enabled);
}

pub fn set_log_level(debug_enabled: bool) {
    if debug_enabled {
        log::set_max_level(LevelFilter::Debug);
    } else {
        log::set_max_level(LevelFilter::Info);
    }
}
