//! Stderr logger for the `log` facade.

use log::{LevelFilter, Metadata, Record};

pub const LOG_ENV: &str = "COPYCULL_LOG";

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the logger. `-v` wins over `COPYCULL_LOG`, which wins over the
/// defaults file; otherwise only warnings and errors are shown.
pub fn init_logging(verbose: u8, configured: Option<&str>) {
    static LOGGER: SimpleLogger = SimpleLogger;
    let _ = log::set_logger(&LOGGER);
    let env = std::env::var(LOG_ENV).ok();
    log::set_max_level(resolve_level(verbose, env.as_deref(), configured));
}

fn resolve_level(verbose: u8, env: Option<&str>, configured: Option<&str>) -> LevelFilter {
    match verbose {
        0 => {}
        1 => return LevelFilter::Debug,
        _ => return LevelFilter::Trace,
    }
    env.into_iter()
        .chain(configured)
        .find_map(|level| level.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag_wins() {
        assert_eq!(resolve_level(1, Some("off"), None), LevelFilter::Debug);
        assert_eq!(resolve_level(3, None, Some("error")), LevelFilter::Trace);
    }

    #[test]
    fn test_env_then_defaults_file() {
        assert_eq!(resolve_level(0, Some("info"), Some("error")), LevelFilter::Info);
        assert_eq!(resolve_level(0, Some("nonsense"), Some("error")), LevelFilter::Error);
        assert_eq!(resolve_level(0, None, None), LevelFilter::Warn);
    }
}
