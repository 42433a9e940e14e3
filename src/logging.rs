//! Logging configuration for named-injector
//!
//! The container emits `tracing` events under the `named_injector` target:
//! registrations and constructions at `DEBUG`, memo hits and behaviour
//! applications at `TRACE`. This module installs a subscriber for them.
//!
//! # Features
//!
//! - `logging` - Emit events (default)
//! - `logging-json` - Install a JSON subscriber (recommended for production)
//! - `logging-pretty` - Install a pretty subscriber (recommended for development)
//!
//! # Example
//!
//! ```rust,ignore
//! use named_injector::logging;
//!
//! // Default settings (JSON if logging-json, pretty if logging-pretty)
//! logging::init();
//!
//! // Or use the builder
//! logging::builder()
//!     .trace()
//!     .container_only()
//!     .compact()
//!     .init();
//! ```

use tracing::Level;

/// Target every container event is emitted under
pub const TARGET: &str = "named_injector";

/// Logging format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logging (production default)
    #[default]
    Json,
    /// Pretty multi-line output (development)
    Pretty,
    /// Compact single-line output
    Compact,
}

/// Builder for logging configuration
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
        }
    }
}

impl LoggingBuilder {
    /// Create a new logging builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set log level to TRACE, which includes memo hits
    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    /// Set log level to DEBUG
    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    /// Set log level to INFO
    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    /// Filter to only show logs from a specific target
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show container logs
    pub fn container_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Include file names in log output
    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    /// Include line numbers in log output
    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    /// Include thread IDs in log output, useful with multi-threaded runtimes
    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    /// Use JSON structured logging format
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Use pretty logging format
    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    /// Use compact single-line logging format
    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// The `EnvFilter` directive this builder installs
    pub fn directive(&self) -> String {
        match self.target {
            Some(target) => format!("{}={}", target, self.level),
            None => self.level.to_string(),
        }
    }

    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    fn subscriber(self) -> impl tracing::Subscriber + Send + Sync + 'static {
        use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

        let filter = EnvFilter::new(self.directive());
        let layer = fmt::layer()
            .with_file(self.with_file)
            .with_line_number(self.with_line_number)
            .with_thread_ids(self.with_thread_ids)
            .with_target(true);

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => layer.json().boxed(),
            // Without logging-json, JSON falls back to the default format
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
        };

        tracing_subscriber::registry().with(layer).with(filter)
    }

    /// Install the subscriber, returning an error if one is already installed
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> Result<(), tracing_subscriber::util::TryInitError> {
        use tracing_subscriber::util::SubscriberInitExt;

        self.subscriber().try_init()
    }

    /// Initialize the logging subscriber with the configured settings
    ///
    /// Requires either `logging-json` or `logging-pretty` feature to be enabled.
    ///
    /// # Panics
    ///
    /// Panics if a global subscriber is already installed; use
    /// [`try_init`](Self::try_init) to keep an existing one.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        use tracing_subscriber::util::SubscriberInitExt;

        self.subscriber().init();
    }

    /// Initialize (no-op when subscriber features not available)
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Initialize logging with default settings
///
/// Uses JSON format if `logging-json` feature is enabled,
/// otherwise pretty format.
pub fn init() {
    if cfg!(feature = "logging-json") {
        init_json();
    } else {
        init_pretty();
    }
}

/// Initialize JSON structured logging
///
/// # Example output
/// ```json
/// {"timestamp":"2026-01-01T00:00:00.000Z","level":"DEBUG","fields":{"message":"Constructing service","service":"users"},"target":"named_injector"}
/// ```
pub fn init_json() {
    builder().json().debug().init();
}

/// Initialize pretty logging
pub fn init_pretty() {
    builder().pretty().debug().init();
}

/// Initialize logging for container events only (filters other crates)
pub fn init_container_only() {
    builder().container_only().debug().init();
}
