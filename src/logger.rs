use std::io::Write;
use std::time::{Duration, Instant};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;

const DEFAULT_FILTER: LevelFilter = LevelFilter::Warn;

struct CmdTreeLogger {
    file: Option<Mutex<std::fs::File>>,
    filter: LevelFilter,
    start: Instant,
}

impl Log for CmdTreeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_record(self.start.elapsed(), record);
        let _ = writeln!(std::io::stderr().lock(), "{line}");

        if let Some(ref file) = self.file {
            let _ = writeln!(file.lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(ref file) = self.file {
            let _ = file.lock().flush();
        }
    }
}

fn format_record(elapsed: Duration, record: &Record) -> String {
    format!(
        "[{:.3}s] [{}] {} - {}",
        elapsed.as_secs_f64(),
        record.level(),
        record.target(),
        record.args()
    )
}

/// Parse a `RUST_LOG` style level, falling back to `warn`
#[must_use]
pub fn parse_filter(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_FILTER)
}

/// Install the global logger, writing to stderr and optionally to `log_file`.
///
/// The level comes from `RUST_LOG`.
///
/// # Errors
///
/// Returns `SetLoggerError` if a logger is already installed.
pub fn init(log_file: Option<std::fs::File>) -> Result<(), SetLoggerError> {
    let filter = parse_filter(std::env::var("RUST_LOG").ok().as_deref());

    let logger = CmdTreeLogger {
        file: log_file.map(Mutex::new),
        filter,
        start: Instant::now(),
    };

    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter(Some("debug")), LevelFilter::Debug);
        assert_eq!(parse_filter(Some(" TRACE ")), LevelFilter::Trace);
        assert_eq!(parse_filter(Some("nonsense")), LevelFilter::Warn);
        assert_eq!(parse_filter(None), LevelFilter::Warn);
    }

    #[test]
    fn test_format_record() {
        let line = format_record(
            Duration::from_millis(1500),
            &Record::builder()
                .level(Level::Info)
                .target("cmdtree::commands::tree")
                .args(format_args!("Registered subcommand `tool build`"))
                .build(),
        );
        assert_eq!(
            line,
            "[1.500s] [INFO] cmdtree::commands::tree - Registered subcommand `tool build`"
        );
    }

    #[test]
    fn test_enabled_respects_filter() {
        let logger = CmdTreeLogger {
            file: None,
            filter: LevelFilter::Info,
            start: Instant::now(),
        };
        let debug = Metadata::builder().level(Level::Debug).build();
        let warn = Metadata::builder().level(Level::Warn).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&warn));
    }
}
