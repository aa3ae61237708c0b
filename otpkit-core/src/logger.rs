//! Forwarding of library log records to a host-provided logger.

use std::sync::{Arc, OnceLock};

/// Receiver for log messages emitted by this library.
///
/// Hosts implement this to route messages into their own logging system.
/// Under the `ffi` feature it is exported through `UniFFI`, so Swift and
/// Kotlin code can implement it too.
///
/// # Examples
///
/// ```rust
/// use otpkit_core::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Swift
///
/// ```swift
/// final class OtpKitLoggerBridge: OtpKit.Logger {
///     static let shared = OtpKitLoggerBridge()
///
///     func log(level: OtpKit.LogLevel, message: String) {
///         Log.log(level.toCoreLevel(), message)
///     }
/// }
///
/// OtpKit.setLogger(logger: OtpKitLoggerBridge.shared) // once, at launch
/// ```
#[cfg_attr(feature = "ffi", uniffi::export(with_foreign))]
pub trait Logger: Sync + Send {
    /// Records a message.
    ///
    /// # Arguments
    ///
    /// * `level` - Severity of the message.
    /// * `message` - Fully formatted message text.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Debugging information.
    Debug,
    /// Normal progress.
    Info,
    /// Something unexpected that the library recovered from, such as a
    /// stored token that could not be read.
    Warn,
    /// A failure.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// `log::Log` implementation that hands records to the installed [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        is_forwarded(metadata.level(), metadata.target())
    }

    /// Forwards `record` to the installed [`Logger`], if any.
    ///
    /// Records arriving before [`set_logger`] completes are dropped.
    fn log(&self, record: &log::Record) {
        let module = record.module_path().unwrap_or_else(|| record.target());
        if !is_forwarded(record.level(), module) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace output from other crates is dropped; everything else passes.
fn is_forwarded(level: log::Level, module: &str) -> bool {
    level <= log::Level::Info || module.starts_with("otpkit")
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs `logger` as the destination for this library's log output.
///
/// Call this once during application startup, before any keychain call that
/// should be logged.
///
/// # Arguments
///
/// * `logger` - The host implementation that receives every forwarded record.
///
/// # Note
///
/// Only the first call has an effect. Later calls, or a call made after the
/// process already installed another `log` backend, are ignored with a
/// message on stderr.
#[cfg_attr(feature = "ffi", uniffi::export)]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("otpkit logger already set");
        return;
    }
    if let Err(err) = init_logger() {
        eprintln!("failed to install otpkit logger: {err}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
