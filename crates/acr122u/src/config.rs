//! Configuration options for reader sessions and logging

use std::fmt;
use std::time::Duration;

use pcsc::{Protocols as PcscProtocols, ShareMode as PcscShareMode};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Default bound on each blocking wait for a reader change
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Sharing mode for card connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShareMode {
    /// Exclusive access to the card
    Exclusive,
    /// Shared access to the card (default)
    #[default]
    Shared,
}

impl From<ShareMode> for PcscShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
        }
    }
}

/// Protocol negotiated when connecting to a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// No protocol preference
    Undefined,
    /// T=0
    T0,
    /// T=1
    T1,
    /// T=0 or T=1 (default)
    #[default]
    Any,
}

impl From<Protocol> for PcscProtocols {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Undefined => Self::UNDEFINED,
            Protocol::T0 => Self::T0,
            Protocol::T1 => Self::T1,
            Protocol::Any => Self::ANY,
        }
    }
}

/// Severity threshold for log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Everything, including per-quantum wait timeouts
    Trace,
    /// Connect, read and disconnect steps (default)
    #[default]
    Debug,
    /// Reader transitions
    Info,
    /// Warnings
    Warn,
    /// Errors only
    Error,
    /// Fatal records only
    Fatal,
    /// Panic records only
    Panic,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
            // Nothing is ever logged above error
            LogLevel::Fatal | LogLevel::Panic => Self::OFF,
        }
    }
}

/// Destination for log records
#[derive(Default)]
pub enum LogOutput {
    /// Human readable lines on stderr (default)
    #[default]
    Console,
    /// One JSON object per line on stderr
    Json,
    /// Keep whatever subscriber the caller has installed
    Inherit,
    /// Human readable lines to a custom writer
    Writer(BoxMakeWriter),
}

impl fmt::Debug for LogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console => write!(f, "Console"),
            Self::Json => write!(f, "Json"),
            Self::Inherit => write!(f, "Inherit"),
            Self::Writer(_) => write!(f, "Writer(..)"),
        }
    }
}

/// Configuration options for a [`Context`](crate::Context)
#[derive(Debug)]
pub struct Config {
    /// Sharing mode for card connections
    pub share_mode: ShareMode,

    /// Preferred protocol for card communication
    pub protocol: Protocol,

    /// Bound on each blocking wait, and so on cancellation latency
    pub poll_interval: Duration,

    /// Log severity threshold
    pub log_level: LogLevel,

    /// Log destination
    pub log_output: LogOutput,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            share_mode: ShareMode::Shared,
            protocol: Protocol::Any,
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_level: LogLevel::Debug,
            log_output: LogOutput::Console,
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sharing mode
    pub const fn with_share_mode(mut self, mode: ShareMode) -> Self {
        self.share_mode = mode;
        self
    }

    /// Set the preferred protocol
    pub const fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the poll quantum
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the log severity threshold
    pub const fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Set the log destination
    pub fn with_log_output(mut self, output: LogOutput) -> Self {
        self.log_output = output;
        self
    }
}
