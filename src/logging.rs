//! Structured logging using the tracing crate.
//!
//! Logs go to stderr so a template rendered to stdout stays clean.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Log level threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Level for a `-v` count; zero keeps `base`.
    pub fn from_verbosity(verbosity: u8, base: LogLevel) -> Self {
        match verbosity {
            0 => base,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(Error::invalid_config(
                "logging.level",
                format!("unknown log level '{}'", other),
            )),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(Error::invalid_config(
                "logging.format",
                format!("unknown log format '{}'", other),
            )),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Colorize output
    pub ansi_colors: bool,
    /// Include the event target
    pub with_target: bool,
    /// Log span open/close events
    pub with_spans: bool,
    /// Filter directive used when `RUST_LOG` is unset
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            ansi_colors: true,
            with_target: false,
            with_spans: false,
            filter: None,
        }
    }
}

/// Builder for the global subscriber.
pub struct LoggingBuilder {
    config: LoggingConfig,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            config: LoggingConfig::default(),
        }
    }

    /// Create a builder from an existing configuration.
    pub fn from_config(config: LoggingConfig) -> Self {
        Self { config }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.config.ansi_colors = enabled;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.config.with_target = enabled;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.filter = Some(filter.into());
        self
    }

    /// `RUST_LOG` wins, then the configured directive, then the level.
    fn build_filter(&self) -> EnvFilter {
        let level = self.config.level.as_str();
        EnvFilter::try_from_default_env()
            .or_else(|_| match self.config.filter {
                Some(ref filter) => EnvFilter::try_new(filter),
                None => EnvFilter::try_new(level),
            })
            .unwrap_or_else(|_| EnvFilter::new(level))
    }

    fn span_events(&self) -> FmtSpan {
        if self.config.with_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// Install the global subscriber.
    pub fn init(self) -> Result<()> {
        let env_filter = self.build_filter();
        let span_events = self.span_events();
        let registry = tracing_subscriber::registry().with(env_filter);

        let result = match self.config.format {
            LogFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr)
                        .with_ansi(self.config.ansi_colors)
                        .with_target(self.config.with_target)
                        .with_span_events(span_events),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr)
                        .with_ansi(self.config.ansi_colors)
                        .with_target(self.config.with_target)
                        .with_span_events(span_events),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_current_span(self.config.with_spans)
                        .with_span_list(self.config.with_spans)
                        .with_span_events(span_events),
                )
                .try_init(),
        };

        result.map_err(|e| Error::Config(e.to_string()))
    }
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_raises_level() {
        assert_eq!(LogLevel::from_verbosity(0, LogLevel::Warn), LogLevel::Warn);
        assert_eq!(LogLevel::from_verbosity(1, LogLevel::Warn), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(2, LogLevel::Warn), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(7, LogLevel::Warn), LogLevel::Trace);
    }

    #[test]
    fn test_parse_level_and_format() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_builder_overrides_config() {
        let builder = LoggingBuilder::new()
            .with_level(LogLevel::Debug)
            .with_format(LogFormat::Json)
            .with_ansi(false)
            .with_filter("ec2_ssh_stack=trace");
        assert_eq!(builder.config.level, LogLevel::Debug);
        assert_eq!(builder.config.format, LogFormat::Json);
        assert!(!builder.config.ansi_colors);
        assert_eq!(builder.config.filter.as_deref(), Some("ec2_ssh_stack=trace"));
    }
}
