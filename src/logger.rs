//! `log` backend that writes to the browser devtools console.

use log::{Level, LevelFilter, Metadata, Record};
use wasm_bindgen::JsValue;
use web_sys::console;

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!(
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        ));
        match record.level() {
            Level::Error => console::error_1(&line),
            Level::Warn => console::warn_1(&line),
            Level::Info => console::info_1(&line),
            Level::Debug => console::debug_1(&line),
            Level::Trace => console::log_1(&line),
        }
    }

    fn flush(&self) {}
}

/// Parses a level name ("warn", "debug", ...); unknown or missing names
/// mean `Info`.
pub fn level_filter(name: Option<&str>) -> LevelFilter {
    name.and_then(|n| n.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Installs the console logger. Calling it again only changes the level.
pub fn init(level: Option<&str>) {
    // a logger may already be installed by an earlier call or the host
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level_filter(level));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_filter(Some("WARN")), LevelFilter::Warn);
        assert_eq!(level_filter(Some(" off ")), LevelFilter::Off);
        assert_eq!(level_filter(Some("chatty")), LevelFilter::Info);
        assert_eq!(level_filter(None), LevelFilter::Info);
    }
}
