//! `tracing` subscriber setup

use crate::config::{ColorChoice, Verbosity};
use tracing_subscriber::EnvFilter;

/// Filter for the given verbosity; `RUST_LOG` wins when set and valid
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()))
}

/// Install a stderr `fmt` subscriber
///
/// A subscriber installed earlier (tests, embedding) is left in place.
pub fn init_tracing(verbosity: Verbosity, color: ColorChoice) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_ansi(color.should_color())
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(Verbosity::Quiet, ColorChoice::Never);
        init_tracing(Verbosity::Debug, ColorChoice::Never);
    }
}
