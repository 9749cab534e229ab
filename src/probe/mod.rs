//! Username availability probes

pub mod http;

pub use http::HttpProbe;

use std::time::Duration;

use async_trait::async_trait;

use crate::config_error;
use crate::error::Result;
use crate::types::{Candidate, ProbeConfig, ProbeVerdict};

/// A way of deciding whether a name is free.
///
/// Implementations never fail: network errors and timeouts collapse into
/// [`ProbeVerdict::Taken`]. A throttled service reports
/// [`ProbeVerdict::RateLimited`] so the scheduler can back off.
#[async_trait]
pub trait NickProbe: Send + Sync {
    /// Probe one candidate
    async fn probe(&self, candidate: &Candidate) -> ProbeVerdict;

    /// Short name used in logs
    fn name(&self) -> &str;
}

pub const AVATAR_URL_VAR: &str = "NICK_FORGE_AVATAR_URL";
pub const PROFILE_URL_VAR: &str = "NICK_FORGE_PROFILE_URL";
pub const AVATAR_TIMEOUT_VAR: &str = "NICK_FORGE_AVATAR_TIMEOUT_MS";
pub const PROFILE_TIMEOUT_VAR: &str = "NICK_FORGE_PROFILE_TIMEOUT_MS";

impl ProbeConfig {
    /// Build the probe configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the probe configuration from an arbitrary key lookup.
    ///
    /// An empty profile URL disables the confirmation stage.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(AVATAR_URL_VAR) {
            config.avatar_url = url;
        }
        if let Some(url) = lookup(PROFILE_URL_VAR) {
            let url = url.trim().to_string();
            config.profile_url = if url.is_empty() { None } else { Some(url) };
        }
        if let Some(ms) = lookup(AVATAR_TIMEOUT_VAR) {
            config.avatar_timeout = parse_millis(AVATAR_TIMEOUT_VAR, &ms)?;
        }
        if let Some(ms) = lookup(PROFILE_TIMEOUT_VAR) {
            config.profile_timeout = parse_millis(PROFILE_TIMEOUT_VAR, &ms)?;
        }

        if !config.avatar_url.contains("{name}") {
            return Err(config_error!("{} must contain a {{name}} placeholder", AVATAR_URL_VAR));
        }
        if let Some(url) = &config.profile_url {
            if !url.contains("{name}") {
                return Err(config_error!("{} must contain a {{name}} placeholder", PROFILE_URL_VAR));
            }
        }

        Ok(config)
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration> {
    let ms: u64 = raw
        .trim()
        .parse()
        .map_err(|_| config_error!("{} must be a number of milliseconds, got '{}'", key, raw))?;
    if ms == 0 {
        return Err(config_error!("{} must be greater than zero", key));
    }
    Ok(Duration::from_millis(ms))
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = ProbeConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.avatar_url.contains("{name}"));
        assert!(config.profile_url.is_some());
        assert_eq!(config.avatar_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_overrides() {
        let config = ProbeConfig::from_lookup(lookup(&[
            (AVATAR_URL_VAR, "http://localhost/a/{name}"),
            (PROFILE_URL_VAR, ""),
            (AVATAR_TIMEOUT_VAR, "750"),
        ]))
        .unwrap();
        assert_eq!(config.avatar_url, "http://localhost/a/{name}");
        assert!(config.profile_url.is_none());
        assert_eq!(config.avatar_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_rejects_bad_timeout() {
        assert!(ProbeConfig::from_lookup(lookup(&[(PROFILE_TIMEOUT_VAR, "soon")])).is_err());
        assert!(ProbeConfig::from_lookup(lookup(&[(AVATAR_TIMEOUT_VAR, "0")])).is_err());
    }

    #[test]
    fn test_rejects_template_without_placeholder() {
        let result = ProbeConfig::from_lookup(lookup(&[(AVATAR_URL_VAR, "http://localhost/a")]));
        assert!(result.is_err());
    }
}
