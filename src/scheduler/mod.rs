//! Tick scheduling: compute passes and the apply phase.
//!
//! A tick has two halves:
//! - compute: every session places its followers against a frozen world
//!   snapshot (inline, on a worker thread, or fanned out with rayon)
//! - apply: on the host's thread, moves are written back and structural
//!   changes made during compute are flushed
//!
//! [`FollowScheduler`] drives both halves on a fixed interval.

pub mod driver;
pub mod tick;
pub mod worker;

pub use driver::FollowScheduler;
pub use tick::{compute_tick, filter_position, ComputeJob, TickReport, TickSummary};
pub use worker::ComputeWorker;
