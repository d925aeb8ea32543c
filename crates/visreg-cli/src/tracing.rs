//! Log subscriber setup
//!
//! `RUST_LOG` wins when set; otherwise the level follows `-q`/`-v`.
//! Logs go to stderr so stdout stays machine-readable.

use crate::config::Verbosity;
use tracing_subscriber::EnvFilter;

/// Filter for the given verbosity, honouring `RUST_LOG`
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init(Verbosity::Quiet);
        init(Verbosity::Trace);
    }

    #[test]
    fn test_env_filter_builds() {
        let filter = env_filter(Verbosity::Verbose);
        assert!(!filter.to_string().is_empty());
    }
}
