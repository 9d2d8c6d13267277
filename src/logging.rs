//! Logger initialization.
//!
//! Diagnostics go to stderr through `log` + `simplelog`; command output is
//! printed by [`crate::output`] on stdout, so piping a listing stays clean.

use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, ConfigBuilder, TermLogger, TerminalMode};

/// Level for a repeated `-v` flag.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn build_config(level: LevelFilter) -> Config {
    let mut builder = ConfigBuilder::new();
    builder
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error);
    // HTTP client internals are noisy at debug level
    if level >= LevelFilter::Debug {
        builder.add_filter_allow_str("impressions");
    }
    builder.build()
}

/// Initialize the terminal logger. A second call is a no-op.
pub fn init(verbosity: u8) {
    let level = level_for(verbosity);
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        build_config(level),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )]);
}

/// Initialize a logger for tests. Safe to call from every test.
pub fn init_for_tests() {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
