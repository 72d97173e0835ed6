//! Tracing subscriber setup for the gateway binary.
//!
//! Output is human-readable text by default and one JSON object per event
//! when `LOG_FORMAT=json`. `RUST_LOG` overrides the default filter.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "shop_auth_gateway=info,tower_http=info";

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directives in `EnvFilter` syntax.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// Reads `RUST_LOG` and `LOG_FORMAT` from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let filter = lookup("RUST_LOG")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        let format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self { filter, format }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }

    /// Installs the global subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`TryInitError`] if a global subscriber is already set.
    pub fn init(&self) -> Result<(), TryInitError> {
        let json_layer =
            (self.format == LogFormat::Json).then(|| fmt::layer().json().flatten_event(true));
        let text_layer = (self.format == LogFormat::Text).then(fmt::layer);

        tracing_subscriber::registry()
            .with(self.env_filter())
            .with(json_layer)
            .with(text_layer)
            .try_init()
    }
}
