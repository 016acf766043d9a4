//! Logging boundary for map loading and saving.
//!
//! Codecs never print directly. Everything they have to say goes through a [`MapLogger`]
//! supplied by the caller; [`TracingLogger`] is the default and forwards to `tracing`.

use std::fmt;
use std::sync::Arc;

/// Severity of a map diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    /// Chatty details (ignored non-zero components and similar).
    InfoVerbose,
    Warning,
    /// Authoring mistakes in JSON documents that do not block loading.
    SyntaxWarning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "info",
            Self::InfoVerbose => "info-verbose",
            Self::Warning => "warning",
            Self::SyntaxWarning => "syntax-warning",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Receiver for map diagnostics.
pub trait MapLogger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Shared logger handle, cloned into every component that reports.
pub type SharedLogger = Arc<dyn MapLogger>;

/// Forwards map diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl MapLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::InfoVerbose => tracing::debug!("{}", message),
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::SyntaxWarning => tracing::warn!(target: "mapforge::syntax", "{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
    }
}

/// Returns the default logger.
pub fn default_logger() -> SharedLogger {
    Arc::new(TracingLogger)
}

/// Formats and sends a message to a [`MapLogger`].
///
/// ```ignore
/// map_log!(logger, LogLevel::Warning, "{}: ignoring inFire({})", path, in_fire);
/// ```
#[macro_export]
macro_rules! map_log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $crate::logging::MapLogger::log(&*$logger, $level, &format!($($arg)+))
    };
}
