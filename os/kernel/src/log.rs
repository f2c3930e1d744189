/* ╔═════════════════════════════════════════════════════════════════════════╗
   ║ Module: log                                                             ║
   ╟─────────────────────────────────────────────────────────────────────────╢
   ║ Descr.: Logger implementation. Support one or several output streams.   ║
   ║         Messages are dumped on each output stream.                      ║
   ╚═════════════════════════════════════════════════════════════════════════╝
*/
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::ptr;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use spin::RwLock;

use crate::built_info;

/// Sink for log messages, e.g. a serial port or a terminal.
pub trait OutputStream: Send + Sync {
    fn write_str(&self, string: &str);
}

pub struct Logger {
    level: RwLock<Level>,
    streams: RwLock<Vec<&'static dyn OutputStream>>,
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= *self.level.read()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let string = format_record(record);
        for stream in self.streams.read().iter() {
            stream.write_str(&string);
        }
    }

    fn flush(&self) {}
}

impl Logger {
    pub const fn new() -> Self {
        Self {
            level: RwLock::new(Level::Info),
            streams: RwLock::new(Vec::new()),
        }
    }

    /// Install as global logger. Debug builds also log debug messages.
    pub fn init(&'static self) -> Result<(), SetLoggerError> {
        if built_info::PROFILE == "debug" {
            self.set_level(Level::Debug);
        }

        log::set_logger(self).map(|()| log::set_max_level(LevelFilter::Debug))
    }

    pub fn level(&self) -> Level {
        *self.level.read()
    }

    pub fn set_level(&self, level: Level) {
        *self.level.write() = level;
    }

    pub fn register(&self, stream: &'static dyn OutputStream) {
        self.streams.write().push(stream);
    }

    pub fn remove(&self, stream: &dyn OutputStream) {
        self.streams.write().retain(|element| !ptr::addr_eq(ptr::from_ref(*element), ptr::from_ref(stream)));
    }
}

fn format_record(record: &Record) -> String {
    let file = record.file().unwrap_or("unknown").rsplit('/').next().unwrap_or("unknown");
    let line = record.line().unwrap_or(0);

    format!("[{}][{}@{:0>3}] {}\n", level_token(record.level()), file, line, record.args())
}

fn level_token(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info => "INF",
        Level::Warn => "WRN",
        Level::Error => "ERR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;
    use std::boxed::Box;

    #[derive(Default)]
    struct CaptureStream {
        lines: spin::Mutex<Vec<String>>,
    }

    impl OutputStream for CaptureStream {
        fn write_str(&self, string: &str) {
            self.lines.lock().push(String::from(string));
        }
    }

    fn capture() -> &'static CaptureStream {
        Box::leak(Box::new(CaptureStream::default()))
    }

    fn log_at(logger: &Logger, level: Level, message: &str) {
        logger.log(
            &Record::builder()
                .level(level)
                .file(Some("os/kernel/src/syscall/sys_vmem.rs"))
                .line(Some(42))
                .args(format_args!("{}", message))
                .build(),
        );
    }

    #[test]
    fn record_format_has_level_file_and_line() {
        let logger = Logger::new();
        let stream = capture();
        logger.register(stream);

        log_at(&logger, Level::Warn, "sbrk failed");
        assert_eq!(*stream.lines.lock(), ["[WRN][sys_vmem.rs@042] sbrk failed\n"]);
    }

    #[test]
    fn messages_below_level_are_dropped() {
        let logger = Logger::new();
        let stream = capture();
        logger.register(stream);

        log_at(&logger, Level::Debug, "hidden");
        assert!(stream.lines.lock().is_empty());

        logger.set_level(Level::Debug);
        log_at(&logger, Level::Debug, "visible");
        assert_eq!(stream.lines.lock().len(), 1);
    }

    #[test]
    fn every_stream_receives_messages_until_removed() {
        let logger = Logger::new();
        let first = capture();
        let second = capture();
        logger.register(first);
        logger.register(second);

        log_at(&logger, Level::Info, "one");
        logger.remove(first);
        log_at(&logger, Level::Error, "two");

        assert_eq!(first.lines.lock().len(), 1);
        assert_eq!(second.lines.lock().len(), 2);
    }
}
