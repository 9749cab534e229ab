//! Two-stage HTTP availability probe

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::timeout;

use super::NickProbe;
use crate::types::{Candidate, ProbeConfig, ProbeVerdict};

/// What a single HTTP call came back with
#[derive(Debug, Clone, PartialEq, Eq)]
enum StageOutcome {
    Status(u16),
    Failed(String),
    TimedOut,
}

/// Probe that checks an avatar service first and, when that looks free,
/// confirms against a profile lookup service.
///
/// The avatar service is cheap and unthrottled but noisy. The profile
/// service is authoritative but rate-limited, so it is only asked about
/// names that already passed the avatar check. A name is reported
/// available only when every configured stage agrees.
pub struct HttpProbe {
    config: ProbeConfig,
    client: Client,
}

impl HttpProbe {
    /// Create a probe with the default endpoints
    pub fn new() -> Self {
        Self::with_config(ProbeConfig::default())
    }

    /// Create a probe with custom endpoints and timeouts
    pub fn with_config(config: ProbeConfig) -> Self {
        let backstop = config.avatar_timeout.max(config.profile_timeout) + Duration::from_millis(500);
        let client = Client::builder()
            .timeout(backstop)
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(64)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to create tuned HTTP client: {}. Using default.", e);
                Client::new()
            });

        Self { config, client }
    }

    fn url_for(template: &str, candidate: &Candidate) -> String {
        template.replace("{name}", candidate.as_str())
    }

    async fn fetch(&self, url: &str, limit: Duration) -> StageOutcome {
        match timeout(limit, self.client.get(url).send()).await {
            Ok(Ok(response)) => StageOutcome::Status(response.status().as_u16()),
            Ok(Err(e)) if e.is_timeout() => StageOutcome::TimedOut,
            Ok(Err(e)) => StageOutcome::Failed(e.to_string()),
            Err(_) => StageOutcome::TimedOut,
        }
    }

    fn is_free_status(&self, status: u16) -> bool {
        self.config.free_statuses.contains(&status)
    }

    /// Stage one: true when the avatar lookup suggests the name is unused
    async fn avatar_looks_free(&self, candidate: &Candidate) -> bool {
        let url = Self::url_for(&self.config.avatar_url, candidate);
        let start = Instant::now();
        let outcome = self.fetch(&url, self.config.avatar_timeout).await;

        let free = matches!(outcome, StageOutcome::Status(code) if self.is_free_status(code));
        tracing::debug!(
            candidate = %candidate,
            stage = "avatar",
            outcome = ?outcome,
            free,
            duration_ms = %start.elapsed().as_millis(),
            "Probe stage completed"
        );
        free
    }

    /// Stage two: authoritative lookup against the profile service
    async fn confirm_profile(&self, template: &str, candidate: &Candidate) -> ProbeVerdict {
        let url = Self::url_for(template, candidate);
        let start = Instant::now();
        let outcome = self.fetch(&url, self.config.profile_timeout).await;

        let verdict = match outcome {
            StageOutcome::Status(code) if self.is_free_status(code) => ProbeVerdict::Available,
            StageOutcome::Status(code) if code == self.config.rate_limit_status => {
                ProbeVerdict::RateLimited
            }
            _ => ProbeVerdict::Taken,
        };
        tracing::debug!(
            candidate = %candidate,
            stage = "profile",
            outcome = ?outcome,
            verdict = %verdict,
            duration_ms = %start.elapsed().as_millis(),
            "Probe stage completed"
        );
        verdict
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NickProbe for HttpProbe {
    async fn probe(&self, candidate: &Candidate) -> ProbeVerdict {
        if !self.avatar_looks_free(candidate).await {
            return ProbeVerdict::Taken;
        }

        match &self.config.profile_url {
            Some(template) => self.confirm_profile(template, candidate).await,
            None => ProbeVerdict::Available,
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_template() {
        let url = HttpProbe::url_for("https://example.test/u/{name}?size=8", &Candidate::new("Abc"));
        assert_eq!(url, "https://example.test/u/abc?size=8");
    }

    #[test]
    fn test_free_statuses() {
        let probe = HttpProbe::new();
        assert!(probe.is_free_status(404));
        assert!(probe.is_free_status(204));
        assert!(!probe.is_free_status(200));
        assert!(!probe.is_free_status(429));
    }
}
