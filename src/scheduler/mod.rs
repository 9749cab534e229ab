//! Run scheduling: concurrency budget, rate-limit cooldown and run state

mod context;
mod cooldown;
mod run;

pub use context::{InFlightSlot, RunContext, RunState};
pub use cooldown::Cooldown;
pub use run::{RunHandle, RunSummary, Scheduler};
