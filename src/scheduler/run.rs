//! Bounded-concurrency probe scheduler

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::context::RunContext;
use crate::error::{NickForgeError, Result};
use crate::generator::{ConfigValidator, NickGenerator, RecentSet};
use crate::probe::NickProbe;
use crate::types::{Candidate, ConcurrencyTier, ProbeResult, RunConfig, StatsSnapshot};

/// Pause after a slot could not produce a fresh candidate
const SKIP_BACKOFF: Duration = Duration::from_millis(50);

/// Final report of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub target_count: usize,
    pub found_count: usize,
    pub attempt_count: u64,
    pub rate_limited: u64,
    pub skipped_slots: u64,
    pub cooldowns: u64,
    pub tier: ConcurrencyTier,
    pub ceiling: usize,
    pub peak_in_flight: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub attempts_per_second: f64,
    pub stopped_by_user: bool,
    pub accepted: Vec<Candidate>,
}

impl RunSummary {
    /// Whether the run found every name it was asked for
    pub fn completed(&self) -> bool {
        self.found_count >= self.target_count
    }
}

/// Scheduler that keeps a bounded number of probes in flight until the
/// target number of available names is found or the run is stopped.
pub struct Scheduler {
    probe: Arc<dyn NickProbe>,
    config: RunConfig,
    generator: NickGenerator,
}

impl Scheduler {
    pub fn new(probe: Arc<dyn NickProbe>, config: RunConfig) -> Self {
        Self {
            probe,
            config,
            generator: NickGenerator::new(),
        }
    }

    /// Use a specific generator, e.g. a seeded one
    pub fn with_generator(mut self, generator: NickGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Validate the configuration and start the run on the current tokio
    /// runtime. Invalid settings are rejected before any probe is issued.
    pub fn start(self) -> Result<RunHandle> {
        let config = ConfigValidator::new().validate_run(&self.config)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let context = Arc::new(RunContext::new(&config, CancellationToken::new(), tx));

        tracing::info!(
            probe = self.probe.name(),
            target = config.target_count,
            tier = %config.tier,
            ceiling = config.ceiling(),
            algorithm = %config.generation.algorithm,
            min_length = config.generation.min_length,
            max_length = config.generation.max_length,
            prefix = %config.generation.prefix,
            "Starting run"
        );

        let task = tokio::spawn(run_loop(
            self.probe,
            config,
            Arc::clone(&context),
            self.generator,
        ));

        Ok(RunHandle {
            results: rx,
            context,
            task,
        })
    }
}

/// Handle to a running scheduler
pub struct RunHandle {
    results: mpsc::UnboundedReceiver<ProbeResult>,
    context: Arc<RunContext>,
    task: JoinHandle<RunSummary>,
}

impl RunHandle {
    /// Next accepted name. `None` once the run has fully stopped and every
    /// emitted result has been read.
    pub async fn recv(&mut self) -> Option<ProbeResult> {
        self.results.recv().await
    }

    /// Accepted names as a stream borrowed from the handle
    pub fn results(&mut self) -> impl Stream<Item = ProbeResult> + '_ {
        ResultStream {
            inner: &mut self.results,
        }
    }

    /// Ask the run to stop. Probes already in flight finish but their
    /// results are discarded.
    pub fn stop(&self) {
        self.context.request_stop();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.context.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.context.is_running()
    }

    /// Wait until the loop has exited and every in-flight probe settled
    pub async fn wait(self) -> Result<RunSummary> {
        self.task
            .await
            .map_err(|e| NickForgeError::internal(format!("Scheduler task failed: {}", e)))
    }
}

struct ResultStream<'a> {
    inner: &'a mut mpsc::UnboundedReceiver<ProbeResult>,
}

impl Stream for ResultStream<'_> {
    type Item = ProbeResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_recv(cx)
    }
}

async fn run_loop(
    probe: Arc<dyn NickProbe>,
    config: RunConfig,
    context: Arc<RunContext>,
    mut generator: NickGenerator,
) -> RunSummary {
    let _close = CloseOnExit(Arc::clone(&context));
    let ceiling = config.ceiling();
    let semaphore = Arc::new(Semaphore::new(ceiling));
    let mut recent = RecentSet::new(config.recent_capacity);
    let mut probes = JoinSet::new();
    let token = context.token().clone();

    let mut stats_tick = tokio::time::interval(config.stats_interval);
    stats_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        while let Some(joined) = probes.try_join_next() {
            log_probe_failure(joined);
        }

        let permit = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = stats_tick.tick() => {
                log_throughput(&context.snapshot());
                continue;
            }
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        if let Some(wait) = context.cooldown().remaining() {
            tracing::debug!(wait_ms = %wait.as_millis(), "Waiting out cooldown");
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
            context.cooldown().resume();
        }

        if !context.is_running() {
            break;
        }

        let Some(candidate) = next_candidate(&context, &mut generator, &mut recent, &config) else {
            context.stats().increment_skipped();
            tracing::debug!(
                attempts = config.max_generation_attempts,
                "No fresh candidate, skipping slot"
            );
            drop(permit);
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(SKIP_BACKOFF) => {}
            }
            continue;
        };

        let Some(slot) = context.begin_probe(permit) else {
            tracing::debug!(candidate = %candidate, "Cooldown started, holding candidate back");
            context.requeue(candidate);
            continue;
        };
        let probe = Arc::clone(&probe);
        probes.spawn(async move {
            let verdict = probe.probe(&candidate).await;
            slot.context().record_verdict(candidate, verdict);
        });
    }

    context.mark_finished();
    let pending = probes.len();
    if pending > 0 {
        tracing::debug!(pending, "Waiting for in-flight probes to settle");
    }
    while let Some(joined) = probes.join_next().await {
        log_probe_failure(joined);
    }
    context.close_results();

    let summary = summarize(&context, &config);
    tracing::info!(
        found = summary.found_count,
        target = summary.target_count,
        attempts = summary.attempt_count,
        elapsed_secs = summary.elapsed.as_secs_f64(),
        stopped_by_user = summary.stopped_by_user,
        "Run finished"
    );
    summary
}

/// Ends the run and its result stream however the loop exits, so a
/// receiver never waits on a sender nobody will drop.
struct CloseOnExit(Arc<RunContext>);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        self.0.mark_finished();
        self.0.close_results();
    }
}

/// Pick the next name to probe: a rate-limited retry first, otherwise a
/// fresh name not in the recent history.
fn next_candidate(
    context: &RunContext,
    generator: &mut NickGenerator,
    recent: &mut RecentSet,
    config: &RunConfig,
) -> Option<Candidate> {
    if let Some(candidate) = context.take_retry() {
        return Some(candidate);
    }

    for _ in 0..config.max_generation_attempts {
        let candidate = generator.generate(&config.generation);
        if recent.insert(candidate.clone()) {
            return Some(candidate);
        }
    }
    None
}

fn log_probe_failure(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Probe task failed");
    }
}

fn log_throughput(snapshot: &StatsSnapshot) {
    tracing::info!(
        attempts = snapshot.attempts,
        found = snapshot.found,
        target = snapshot.target,
        in_flight = snapshot.in_flight,
        cooling_down = snapshot.cooling_down,
        rate = %format!("{:.1}/s", snapshot.attempts_per_second),
        "Progress"
    );
}

fn summarize(context: &RunContext, config: &RunConfig) -> RunSummary {
    let state = context.state();
    let stats = context.stats();
    RunSummary {
        target_count: state.target_count,
        found_count: state.found_count,
        attempt_count: state.attempt_count,
        rate_limited: stats.rate_limited(),
        skipped_slots: stats.skipped(),
        cooldowns: context.cooldown().entries(),
        tier: config.tier,
        ceiling: config.ceiling(),
        peak_in_flight: state.peak_in_flight,
        started_at: state.started_at,
        finished_at: Utc::now(),
        elapsed: stats.elapsed(),
        attempts_per_second: stats.attempts_per_second(),
        stopped_by_user: context.stopped_by_user(),
        accepted: state.accepted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProbeVerdict;
    use async_trait::async_trait;

    struct AlwaysFree;

    #[async_trait]
    impl NickProbe for AlwaysFree {
        async fn probe(&self, _candidate: &Candidate) -> ProbeVerdict {
            ProbeVerdict::Available
        }

        fn name(&self) -> &str {
            "always-free"
        }
    }

    #[tokio::test]
    async fn test_aborted_loop_still_closes_results() {
        // A zero interval makes the loop panic before its first probe
        let config = RunConfig {
            stats_interval: Duration::ZERO,
            ..RunConfig::default()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let context = Arc::new(RunContext::new(&config, CancellationToken::new(), tx));

        let task = tokio::spawn(run_loop(
            Arc::new(AlwaysFree),
            config,
            Arc::clone(&context),
            NickGenerator::with_seed(7),
        ));

        assert!(task.await.is_err());
        let end = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert!(end.is_none());
        assert!(!context.is_running());
    }
}
