//! Logger setup for the command-line entry point.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Initialize the logger with elapsed-time formatting.
///
/// Output format: `[HH:MM:SS] LEVEL: message`, always on stderr so the report on
/// stdout stays machine readable. `RUST_LOG` overrides `level` when set.
pub fn init_logger(level: log::LevelFilter) {
    START_TIME.set(Instant::now()).ok();

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            let elapsed = START_TIME
                .get()
                .map(|start| start.elapsed())
                .unwrap_or_default();
            let hours = elapsed.as_secs() / 3600;
            let minutes = (elapsed.as_secs() % 3600) / 60;
            let seconds = elapsed.as_secs() % 60;

            writeln!(
                buf,
                "[{:02}:{:02}:{:02}] {}: {}",
                hours,
                minutes,
                seconds,
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();
}

/// Map the CLI verbosity switches onto a level filter.
pub fn level_for(quiet: bool, verbose: bool) -> log::LevelFilter {
    match (quiet, verbose) {
        (true, _) => log::LevelFilter::Warn,
        (false, true) => log::LevelFilter::Debug,
        (false, false) => log::LevelFilter::Info,
    }
}
