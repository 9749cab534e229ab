//! Core types and structures for nick-forge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::NickForgeError;

/// Shortest name the checker accepts
pub const MIN_NAME_LENGTH: usize = 3;
/// Longest name the checker accepts
pub const MAX_NAME_LENGTH: usize = 16;
/// Largest target count for a single run
pub const MAX_TARGET_COUNT: usize = 10_000;
/// Longest fixed prefix
pub const MAX_PREFIX_LENGTH: usize = 3;

/// Name generation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Alternating vowels and consonants
    Pronounceable,
    /// Letters and digits
    Mixed,
    /// Letters only
    #[default]
    Alphabetic,
    /// Digits followed by a single trailing letter
    NumericSuffixed,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Pronounceable,
        Algorithm::Mixed,
        Algorithm::Alphabetic,
        Algorithm::NumericSuffixed,
    ];
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Pronounceable => write!(f, "pronounceable"),
            Algorithm::Mixed => write!(f, "mixed"),
            Algorithm::Alphabetic => write!(f, "alphabetic"),
            Algorithm::NumericSuffixed => write!(f, "numeric-suffixed"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = NickForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pronounceable" | "pronounce" => Ok(Algorithm::Pronounceable),
            "mixed" => Ok(Algorithm::Mixed),
            "alphabetic" | "alpha" | "og" => Ok(Algorithm::Alphabetic),
            "numeric-suffixed" | "numeric" | "num-suffix" => Ok(Algorithm::NumericSuffixed),
            other => Err(NickForgeError::validation(format!(
                "unknown algorithm '{}' (expected pronounceable, mixed, alphabetic or numeric-suffixed)",
                other
            ))),
        }
    }
}

/// Concurrency tier of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyTier {
    #[default]
    Normal,
    Turbo,
}

impl std::fmt::Display for ConcurrencyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConcurrencyTier::Normal => write!(f, "normal"),
            ConcurrencyTier::Turbo => write!(f, "turbo"),
        }
    }
}

/// A generated username candidate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(String);

impl Candidate {
    /// Wrap an already generated name, folding it to lowercase
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Candidate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Configuration for name generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub algorithm: Algorithm,
    pub prefix: String,
    pub insert_separator: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 5,
            algorithm: Algorithm::Alphabetic,
            prefix: String::new(),
            insert_separator: false,
        }
    }
}

/// Configuration for a checking run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub generation: GenerationConfig,
    pub target_count: usize,
    pub tier: ConcurrencyTier,
    /// In-flight ceiling for the normal tier
    pub normal_ceiling: usize,
    /// In-flight ceiling for the turbo tier
    pub turbo_ceiling: usize,
    /// Size of the recent-history set before old entries are trimmed
    pub recent_capacity: usize,
    /// Generation retries per slot when the candidate was already tried
    pub max_generation_attempts: usize,
    /// Pause after a rate-limit signal
    pub cooldown: Duration,
    /// Interval between throughput log lines
    pub stats_interval: Duration,
}

impl RunConfig {
    /// Concurrency ceiling for the configured tier
    pub fn ceiling(&self) -> usize {
        match self.tier {
            ConcurrencyTier::Normal => self.normal_ceiling,
            ConcurrencyTier::Turbo => self.turbo_ceiling,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            target_count: 10,
            tier: ConcurrencyTier::Normal,
            normal_ceiling: 15,
            turbo_ceiling: 60,
            recent_capacity: 50_000,
            max_generation_attempts: 50,
            cooldown: Duration::from_secs(15),
            stats_interval: Duration::from_secs(1),
        }
    }
}

/// Endpoints and timeouts for the HTTP probe.
///
/// URL templates carry a `{name}` placeholder that is replaced with the
/// candidate before each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub avatar_url: String,
    /// Secondary profile lookup; `None` disables confirmation
    pub profile_url: Option<String>,
    pub avatar_timeout: Duration,
    pub profile_timeout: Duration,
    /// Statuses that mean "no such user"
    pub free_statuses: Vec<u16>,
    /// Status the profile service answers with when throttling
    pub rate_limit_status: u16,
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            avatar_url: "https://crafatar.com/avatars/{name}?overlay&size=32".to_string(),
            profile_url: Some("https://api.ashcon.app/mojang/v2/user/{name}".to_string()),
            avatar_timeout: Duration::from_millis(2000),
            profile_timeout: Duration::from_millis(1500),
            free_statuses: vec![404, 204],
            rate_limit_status: 429,
            user_agent: format!("nick-forge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Outcome of probing one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeVerdict {
    Available,
    Taken,
    RateLimited,
}

impl ProbeVerdict {
    pub fn is_available(&self) -> bool {
        matches!(self, ProbeVerdict::Available)
    }
}

impl std::fmt::Display for ProbeVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeVerdict::Available => write!(f, "available"),
            ProbeVerdict::Taken => write!(f, "taken"),
            ProbeVerdict::RateLimited => write!(f, "rate-limited"),
        }
    }
}

/// A probed candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub candidate: Candidate,
    pub verdict: ProbeVerdict,
    pub attempted_at: DateTime<Utc>,
}

/// Run counters, updated from probe completions
#[derive(Debug)]
pub struct RunStats {
    attempts: AtomicU64,
    found: AtomicU64,
    rate_limited: AtomicU64,
    skipped_slots: AtomicU64,
    start_time: Instant,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            found: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            skipped_slots: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_skipped(&self) {
        self.skipped_slots.fetch_add(1, Ordering::Relaxed);
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn found(&self) -> u64 {
        self.found.load(Ordering::Relaxed)
    }

    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_slots.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Probes completed per second since the run started
    pub fn attempts_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.attempts() as f64 / secs
        } else {
            0.0
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub attempts: u64,
    pub found: u64,
    pub target: u64,
    pub rate_limited: u64,
    pub skipped: u64,
    pub in_flight: usize,
    pub cooling_down: bool,
    pub elapsed: Duration,
    pub attempts_per_second: f64,
}
