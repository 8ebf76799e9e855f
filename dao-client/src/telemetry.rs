use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_DIRECTIVE: &str = "dao_client=info";

/// Parses a `RUST_LOG`-style directive list.
pub fn log_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("ignoring RUST_LOG {:?}: {}", directive, e);
        EnvFilter::new(DEFAULT_LOG_DIRECTIVE)
    })
}

/// Installs the global subscriber filtered by `directive`, usually
/// `Config::rust_log`. Fails if a subscriber is already installed.
pub fn init_telemetry(directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(log_filter(directive))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
