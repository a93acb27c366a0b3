//! Subscriber setup for the container's tracing events
//!
//! Every event the container emits uses the `norma_di` target: `debug` for configuration
//! merges, contextual bindings, class registration, construction and lazy initialization,
//! `trace` for store hits, qualification and session bookkeeping.
//!
//! # Features
//!
//! - `logging` - Emit tracing events (default)
//! - `logging-json` - JSON structured output
//! - `logging-pretty` - Colorful multi-line output
//!
//! # Example
//!
//! ```rust,ignore
//! use norma_di::logging::{self, LogFormat};
//!
//! // JSON if logging-json is enabled, pretty otherwise
//! logging::init();
//!
//! // Every resolution step of the container, nothing from other crates
//! logging::builder()
//!     .verbose()
//!     .container_only()
//!     .format(LogFormat::Compact)
//!     .init();
//! ```

use tracing::Level;

/// Target used by every event of this crate
pub const TARGET: &str = "norma_di";

/// Environment variable read by [`LoggingBuilder::from_env`]
pub const ENV_FORMAT: &str = "NORMA_DI_LOG";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Pretty colorful output
    Pretty,
    /// Compact single-line output
    Compact,
}

impl LogFormat {
    /// JSON when `logging-json` is compiled in, pretty otherwise
    pub fn preferred() -> Self {
        if cfg!(feature = "logging-json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }

    /// Parse `json`, `pretty` or `compact` (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Which events pass the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Events {
    All,
    Target(&'static str),
}

/// Builder for logging configuration
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    events: Events,
    source_location: bool,
    thread_ids: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::preferred(),
            events: Events::All,
            source_location: false,
            thread_ids: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default builder with the format taken from `NORMA_DI_LOG` when it names one
    pub fn from_env() -> Self {
        let builder = Self::new();
        match std::env::var(ENV_FORMAT).ok().as_deref().and_then(LogFormat::parse) {
            Some(format) => builder.format(format),
            None => builder,
        }
    }

    /// Minimum level
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Include cache hits, qualification and session enter/leave events
    pub fn verbose(self) -> Self {
        self.level(Level::TRACE)
    }

    /// Drop the container's debug events
    pub fn quiet(self) -> Self {
        self.level(Level::INFO)
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Only events with the given target
    pub fn target(mut self, target: &'static str) -> Self {
        self.events = Events::Target(target);
        self
    }

    /// Only container events
    pub fn container_only(self) -> Self {
        self.target(TARGET)
    }

    /// Print the file and line of each event
    pub fn with_source_location(mut self) -> Self {
        self.source_location = true;
        self
    }

    pub fn with_thread_ids(mut self) -> Self {
        self.thread_ids = true;
        self
    }

    #[cfg_attr(
        not(any(feature = "logging-json", feature = "logging-pretty")),
        allow(dead_code)
    )]
    fn directive(&self) -> String {
        match self.events {
            Events::All => self.level.to_string(),
            Events::Target(target) => format!("{target}={}", self.level),
        }
    }

    /// Install the global subscriber.
    ///
    /// Without `logging-json` a JSON request falls back to the plain format. Installing
    /// twice keeps the first subscriber.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

        let filter = EnvFilter::new(self.directive());
        let base = fmt::layer()
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_thread_ids(self.thread_ids)
            .with_target(true);

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => base.json().boxed(),
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => base.boxed(),
            LogFormat::Pretty => base.pretty().boxed(),
            LogFormat::Compact => base.compact().boxed(),
        };

        let _ = tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init();
    }

    /// No-op without a subscriber feature
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Debug-level logging in the preferred format, overridable with `NORMA_DI_LOG`
pub fn init() {
    LoggingBuilder::from_env().init();
}

/// JSON structured logging at DEBUG.
///
/// # Example output
/// ```json
/// {"timestamp":"2026-01-01T00:00:00.000Z","level":"DEBUG","fields":{"message":"Merged component configuration","declared":3,"total":3},"target":"norma_di"}
/// ```
pub fn init_json() {
    builder().format(LogFormat::Json).init();
}

/// Pretty logging at DEBUG.
///
/// # Example output
/// ```text
///   2026-01-01T00:00:00.000Z DEBUG norma_di: Registered contextual binding, consumer: App|report, needed: $title
/// ```
pub fn init_pretty() {
    builder().format(LogFormat::Pretty).init();
}

/// Container events only, at DEBUG
pub fn init_di_only() {
    builder().container_only().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = LoggingBuilder::default();
        assert_eq!(builder.level, Level::DEBUG);
        assert_eq!(builder.format, LogFormat::preferred());
        assert_eq!(builder.directive(), "DEBUG");
    }

    #[test]
    fn test_container_only_directive() {
        let builder = LoggingBuilder::new()
            .verbose()
            .format(LogFormat::Compact)
            .with_source_location()
            .container_only();

        assert_eq!(builder.format, LogFormat::Compact);
        assert!(builder.source_location);
        assert_eq!(builder.directive(), "norma_di=TRACE");
    }

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" compact "), Some(LogFormat::Compact));
        assert_eq!(LogFormat::parse("xml"), None);
    }
}
