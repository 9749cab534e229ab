//! Nick Forge - username generation and availability checking
//!
//! Generates candidate usernames under a small grammar and checks them
//! against external services, keeping a bounded number of checks in flight
//! until enough free names are found.

pub mod error;
pub mod export;
pub mod generator;
pub mod probe;
pub mod scheduler;
pub mod types;

// Re-export commonly used types
pub use error::{NickForgeError, Result};
pub use types::{
    Algorithm, Candidate, ConcurrencyTier, GenerationConfig, ProbeConfig, ProbeResult,
    ProbeVerdict, RunConfig, RunStats, StatsSnapshot,
};

// Re-export main functionality
pub use generator::{ConfigValidator, NickGenerator, RecentSet};
pub use probe::{HttpProbe, NickProbe};
pub use scheduler::{RunHandle, RunSummary, Scheduler};

/// Initialize the library
pub fn init() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();
    Ok(())
}
