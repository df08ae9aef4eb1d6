//! Logging setup
//!
//! Every event acton-layout emits goes through `tracing`: user-facing
//! provider errors at `info`, internal provider errors and render failures at
//! `error`, successful renders at `info` when debug mode is on. This module
//! installs a subscriber for applications that do not bring their own.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human readable output
    Pretty,
    /// One JSON object per event
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let default_filter = if cfg!(debug_assertions) {
            "debug,acton_layout=trace"
        } else {
            "info"
        };
        Self {
            default_filter: default_filter.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl ObservabilityConfig {
    /// Settings with an explicit fallback filter
    pub fn new(default_filter: impl Into<String>) -> Self {
        Self {
            default_filter: default_filter.into(),
            ..Default::default()
        }
    }

    /// Emit JSON lines
    #[must_use]
    pub const fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Emit pretty output
    #[must_use]
    pub const fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    /// Filter from `RUST_LOG`, or the configured fallback
    ///
    /// # Errors
    ///
    /// Returns an error if the fallback filter does not parse.
    pub fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => Ok(EnvFilter::try_new(&self.default_filter)?),
        }
    }

    /// Install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if the filter is invalid or a global subscriber is
    /// already installed.
    pub fn init(&self) -> anyhow::Result<()> {
        let registry = tracing_subscriber::registry().with(self.env_filter()?);

        match self.format {
            LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init()?,
            LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init()?,
        }

        Ok(())
    }
}

/// Install the default subscriber
///
/// Pretty output in debug builds, JSON in release builds. `RUST_LOG`
/// overrides the level filter.
///
/// # Example
///
/// ```rust,no_run
/// use acton_layout::observability;
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init()?;
/// tracing::info!("application started");
/// # Ok(())
/// # }
/// ```
pub fn init() -> anyhow::Result<()> {
    ObservabilityConfig::default().init()
}
