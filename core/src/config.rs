//! Client configuration.
//!
//! The backend base URL comes from `CUSTOM_STORY_BACKEND`. Timeouts apply to
//! each phase of a request separately and default to 30 seconds.

use std::env;
use std::time::Duration;

use crate::error::StoryError;

pub const BACKEND_URL_VAR: &str = "CUSTOM_STORY_BACKEND";
pub const TIMEOUT_VAR: &str = "CUSTOM_STORY_TIMEOUT_SECS";
pub const MAX_TASKS_VAR: &str = "CUSTOM_STORY_MAX_TASKS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_TASKS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Upper bound on background units running at the same time.
    pub max_background_tasks: usize,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            max_background_tasks: DEFAULT_MAX_TASKS,
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, StoryError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, `from_env` with `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StoryError> {
        let base_url = lookup(BACKEND_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| StoryError::Config(format!("{BACKEND_URL_VAR} is not set")))?;
        let mut config = Self::new(base_url.trim());

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs = parse_positive(TIMEOUT_VAR, &raw)?;
            config = config.with_timeout(Duration::from_secs(secs as u64));
        }
        if let Some(raw) = lookup(MAX_TASKS_VAR) {
            config = config.with_max_background_tasks(parse_positive(MAX_TASKS_VAR, &raw)?);
        }
        config.validate()?;
        Ok(config)
    }

    /// Use one timeout for connect, read and write.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.read_timeout = timeout;
        self.write_timeout = timeout;
        self
    }

    pub fn with_max_background_tasks(mut self, max: usize) -> Self {
        self.max_background_tasks = max;
        self
    }

    pub fn validate(&self) -> Result<(), StoryError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(StoryError::Config(format!(
                "{BACKEND_URL_VAR} must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.max_background_tasks == 0 {
            return Err(StoryError::Config("max_background_tasks must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize, StoryError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(StoryError::Config(format!("{key} must be a positive integer, got {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let config =
            ClientConfig::from_lookup(lookup(&[(BACKEND_URL_VAR, "https://stories.example")]))
                .unwrap();
        assert_eq!(config.base_url, "https://stories.example");
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.write_timeout, Duration::from_secs(30));
        assert_eq!(config.max_background_tasks, 64);
    }

    #[test]
    fn missing_backend_is_config_error() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, StoryError::Config(_)));
    }

    #[test]
    fn overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup(&[
            (BACKEND_URL_VAR, "http://10.0.2.2:3000"),
            (TIMEOUT_VAR, "5"),
            (MAX_TASKS_VAR, "4"),
        ]))
        .unwrap();
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.max_background_tasks, 4);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases: [&[(&str, &str)]; 3] = [
            &[(BACKEND_URL_VAR, "ftp://x")],
            &[(BACKEND_URL_VAR, "http://x"), (TIMEOUT_VAR, "0")],
            &[(BACKEND_URL_VAR, "http://x"), (MAX_TASKS_VAR, "many")],
        ];
        for pairs in cases {
            assert!(ClientConfig::from_lookup(lookup(pairs)).is_err(), "{pairs:?}");
        }
    }
}
