//! Structured logging setup.
//!
//! All modules log through `tracing` macros; this installs the subscriber.
//! `RUST_LOG` takes precedence over the level passed in.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a formatted stderr subscriber.
///
/// Returns `false` when a global subscriber was already installed, which
/// happens when tests or an embedding application set one up first.
pub fn init_logging(default_level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_logging("debug");
        assert!(!init_logging("info"));
    }
}
