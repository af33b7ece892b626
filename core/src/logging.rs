//! Logging setup for hosts that do not install their own `tracing` subscriber.

use tracing_subscriber::EnvFilter;

use crate::error::StoryError;

/// Install a formatted `tracing` subscriber. `RUST_LOG` takes precedence
/// over `default_filter`.
///
/// Returns `Ok(false)` when a global subscriber was already installed.
pub fn init_logging(default_filter: &str) -> Result<bool, StoryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| {
            StoryError::Config(format!("invalid log filter {default_filter:?}: {e}"))
        })?,
    };
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        let _ = init_logging("story_core=debug");
        assert!(!init_logging("info").unwrap());
    }
}
