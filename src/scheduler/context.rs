//! Per-run shared state

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{mpsc, OwnedSemaphorePermit};
use tokio_util::sync::CancellationToken;

use super::cooldown::Cooldown;
use crate::types::{Candidate, ProbeResult, ProbeVerdict, RunConfig, RunStats, StatsSnapshot};

/// Mutable state of one run
#[derive(Debug, Clone)]
pub struct RunState {
    pub running: bool,
    pub target_count: usize,
    pub found_count: usize,
    pub attempt_count: u64,
    pub started_at: DateTime<Utc>,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub accepted: Vec<Candidate>,
}

impl RunState {
    fn new(target_count: usize) -> Self {
        Self {
            running: true,
            target_count,
            found_count: 0,
            attempt_count: 0,
            started_at: Utc::now(),
            in_flight: 0,
            peak_in_flight: 0,
            accepted: Vec::new(),
        }
    }
}

/// Everything the scheduler loop and probe completions share.
///
/// Each mutation of [`RunState`] happens inside one lock scope, and no lock
/// is ever held across an `.await`.
pub struct RunContext {
    state: Mutex<RunState>,
    stats: RunStats,
    cooldown: Cooldown,
    retry: Mutex<VecDeque<Candidate>>,
    results: Mutex<Option<mpsc::UnboundedSender<ProbeResult>>>,
    token: CancellationToken,
    stopped_by_user: Mutex<bool>,
}

impl RunContext {
    pub fn new(
        config: &RunConfig,
        token: CancellationToken,
        results: mpsc::UnboundedSender<ProbeResult>,
    ) -> Self {
        Self {
            state: Mutex::new(RunState::new(config.target_count)),
            stats: RunStats::new(),
            cooldown: Cooldown::new(config.cooldown),
            retry: Mutex::new(VecDeque::new()),
            results: Mutex::new(Some(results)),
            token,
            stopped_by_user: Mutex::new(false),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cooldown(&self) -> &Cooldown {
        &self.cooldown
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Whether new work may still be scheduled or results emitted
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && self.state.lock().running
    }

    /// Cooperative stop requested from outside the run
    pub fn request_stop(&self) {
        if !self.token.is_cancelled() {
            *self.stopped_by_user.lock() = true;
            tracing::info!("Stop requested");
        }
        self.halt();
    }

    pub fn stopped_by_user(&self) -> bool {
        *self.stopped_by_user.lock()
    }

    fn halt(&self) {
        self.state.lock().running = false;
        self.token.cancel();
    }

    /// Claim an in-flight slot for a probe about to start.
    ///
    /// Returns `None` while the cooldown is active. The check runs under the
    /// same lock that `record_verdict` holds when it enters the cooldown, so
    /// no probe can start after a rate-limit verdict has been recorded.
    pub fn begin_probe(self: &Arc<Self>, permit: OwnedSemaphorePermit) -> Option<InFlightSlot> {
        let mut state = self.state.lock();
        if self.cooldown.is_cooling() {
            return None;
        }
        state.in_flight += 1;
        state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
        drop(state);

        Some(InFlightSlot {
            context: Arc::clone(self),
            _permit: permit,
        })
    }

    fn end_probe(&self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
    }

    /// Fold a probe verdict into the run. Returns true if the candidate was
    /// emitted as a result.
    pub fn record_verdict(&self, candidate: Candidate, verdict: ProbeVerdict) -> bool {
        let mut state = self.state.lock();
        state.attempt_count += 1;
        self.stats.increment_attempts();

        let live = state.running && !self.token.is_cancelled();
        match verdict {
            ProbeVerdict::Available if live && state.found_count < state.target_count => {
                state.found_count += 1;
                state.accepted.push(candidate.clone());
                self.stats.increment_found();

                if let Some(sender) = self.results.lock().as_ref() {
                    // The receiver may already be gone; the name stays in `accepted`
                    let _ = sender.send(ProbeResult {
                        candidate: candidate.clone(),
                        verdict,
                        attempted_at: Utc::now(),
                    });
                }
                tracing::info!(
                    candidate = %candidate,
                    found = state.found_count,
                    target = state.target_count,
                    "Available name found"
                );

                if state.found_count >= state.target_count {
                    state.running = false;
                    self.token.cancel();
                    tracing::info!(target = state.target_count, "Target reached");
                }
                true
            }
            ProbeVerdict::RateLimited => {
                self.stats.increment_rate_limited();
                if live {
                    self.cooldown.trigger();
                    self.retry.lock().push_back(candidate);
                }
                false
            }
            _ => false,
        }
    }

    /// Next candidate that was rate-limited and still needs a verdict
    pub fn take_retry(&self) -> Option<Candidate> {
        self.retry.lock().pop_front()
    }

    /// Put a candidate that never got probed back at the head of the queue
    pub fn requeue(&self, candidate: Candidate) {
        self.retry.lock().push_front(candidate);
    }

    /// Drop the result sender so receivers observe the end of the run
    pub fn close_results(&self) {
        self.results.lock().take();
    }

    pub fn state(&self) -> RunState {
        self.state.lock().clone()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let state = self.state.lock();
        StatsSnapshot {
            attempts: state.attempt_count,
            found: state.found_count as u64,
            target: state.target_count as u64,
            rate_limited: self.stats.rate_limited(),
            skipped: self.stats.skipped(),
            in_flight: state.in_flight,
            cooling_down: self.cooldown.is_cooling(),
            elapsed: self.stats.elapsed(),
            attempts_per_second: self.stats.attempts_per_second(),
        }
    }

    pub(crate) fn mark_finished(&self) {
        self.halt();
    }
}

/// Held by a running probe. Dropping it releases the in-flight slot and
/// the semaphore permit, whether the probe finished or panicked.
pub struct InFlightSlot {
    context: Arc<RunContext>,
    _permit: OwnedSemaphorePermit,
}

impl InFlightSlot {
    pub fn context(&self) -> &RunContext {
        &self.context
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.context.end_probe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Semaphore;

    fn context(target: usize) -> (Arc<RunContext>, mpsc::UnboundedReceiver<ProbeResult>) {
        let config = RunConfig {
            target_count: target,
            ..RunConfig::default()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(RunContext::new(&config, CancellationToken::new(), tx)), rx)
    }

    #[test]
    fn test_emits_until_target() {
        let (ctx, mut rx) = context(2);
        assert!(ctx.record_verdict(Candidate::new("aaa"), ProbeVerdict::Available));
        assert!(ctx.record_verdict(Candidate::new("bbb"), ProbeVerdict::Available));
        assert!(!ctx.record_verdict(Candidate::new("ccc"), ProbeVerdict::Available));

        assert_eq!(rx.try_recv().unwrap().candidate.as_str(), "aaa");
        assert_eq!(rx.try_recv().unwrap().candidate.as_str(), "bbb");
        assert!(rx.try_recv().is_err());

        let state = ctx.state();
        assert_eq!(state.found_count, 2);
        assert_eq!(state.attempt_count, 3);
        assert!(!ctx.is_running());
        assert!(ctx.token().is_cancelled());
    }

    #[test]
    fn test_discards_after_stop() {
        let (ctx, mut rx) = context(5);
        ctx.request_stop();
        assert!(!ctx.record_verdict(Candidate::new("late"), ProbeVerdict::Available));
        assert!(rx.try_recv().is_err());
        assert!(ctx.stopped_by_user());
        assert_eq!(ctx.state().attempt_count, 1);
    }

    #[test]
    fn test_rate_limit_queues_retry() {
        let (ctx, _rx) = context(5);
        ctx.record_verdict(Candidate::new("slow"), ProbeVerdict::RateLimited);
        assert!(ctx.cooldown().is_cooling());
        assert_eq!(ctx.take_retry(), Some(Candidate::new("slow")));
        assert_eq!(ctx.take_retry(), None);
        assert_eq!(ctx.snapshot().rate_limited, 1);
    }

    #[test]
    fn test_slot_tracks_in_flight() {
        let (ctx, _rx) = context(5);
        let semaphore = Arc::new(Semaphore::new(2));
        let a = ctx.begin_probe(semaphore.clone().try_acquire_owned().unwrap()).unwrap();
        let b = ctx.begin_probe(semaphore.clone().try_acquire_owned().unwrap()).unwrap();
        assert_eq!(ctx.state().in_flight, 2);
        assert_eq!(semaphore.available_permits(), 0);

        drop(a);
        assert_eq!(ctx.state().in_flight, 1);
        assert_eq!(semaphore.available_permits(), 1);
        drop(b);
        assert_eq!(ctx.state().peak_in_flight, 2);
        assert_eq!(ctx.state().in_flight, 0);
    }

    #[test]
    fn test_no_slot_once_rate_limited() {
        let (ctx, _rx) = context(5);
        let semaphore = Arc::new(Semaphore::new(2));
        let running = ctx.begin_probe(semaphore.clone().try_acquire_owned().unwrap());
        assert!(running.is_some());

        ctx.record_verdict(Candidate::new("busy"), ProbeVerdict::RateLimited);
        let refused = ctx.begin_probe(semaphore.clone().try_acquire_owned().unwrap());
        assert!(refused.is_none());
        assert_eq!(ctx.state().in_flight, 1);
        assert_eq!(semaphore.available_permits(), 1);

        ctx.cooldown().resume();
        assert!(ctx.begin_probe(semaphore.clone().try_acquire_owned().unwrap()).is_some());
        assert_eq!(ctx.state().peak_in_flight, 2);
    }

    #[test]
    fn test_requeue_goes_first() {
        let (ctx, _rx) = context(5);
        ctx.record_verdict(Candidate::new("later"), ProbeVerdict::RateLimited);
        ctx.requeue(Candidate::new("sooner"));
        assert_eq!(ctx.take_retry(), Some(Candidate::new("sooner")));
        assert_eq!(ctx.take_retry(), Some(Candidate::new("later")));
    }

    #[test]
    fn test_close_results_ends_stream() {
        let (ctx, mut rx) = context(1);
        ctx.close_results();
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
