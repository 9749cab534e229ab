//! Rate-limit cooldown

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CooldownState {
    Active,
    Cooling { until: Instant },
}

/// `Active -> Cooling -> Active` switch shared between the scheduler loop and
/// probe completions.
///
/// Entering is idempotent: a second rate-limit signal while cooling does
/// not extend the pause.
#[derive(Debug)]
pub struct Cooldown {
    period: Duration,
    state: Mutex<CooldownState>,
    entries: AtomicU64,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            state: Mutex::new(CooldownState::Active),
            entries: AtomicU64::new(0),
        }
    }

    /// Enter the cooldown. Returns false if already cooling.
    pub fn trigger(&self) -> bool {
        let mut state = self.state.lock();
        if let CooldownState::Cooling { .. } = *state {
            return false;
        }
        *state = CooldownState::Cooling {
            until: Instant::now() + self.period,
        };
        self.entries.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            cooldown_secs = self.period.as_secs_f64(),
            "Rate limit hit, pausing new probes"
        );
        true
    }

    /// Time left before new probes may start, `None` when active
    pub fn remaining(&self) -> Option<Duration> {
        match *self.state.lock() {
            CooldownState::Active => None,
            CooldownState::Cooling { until } => {
                Some(until.saturating_duration_since(Instant::now()))
            }
        }
    }

    /// Return to the active state
    pub fn resume(&self) {
        let mut state = self.state.lock();
        if *state != CooldownState::Active {
            *state = CooldownState::Active;
            tracing::info!("Cooldown over, resuming probes");
        }
    }

    pub fn is_cooling(&self) -> bool {
        !matches!(*self.state.lock(), CooldownState::Active)
    }

    /// How many times the cooldown was entered
    pub fn entries(&self) -> u64 {
        self.entries.load(Ordering::Relaxed)
    }
}
