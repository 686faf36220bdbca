//! Fixed-interval tick driver.
//!
//! The host calls [`FollowScheduler::tick`] (or `begin` and `end`
//! separately) from the thread that owns entity state, as often as it
//! likes. A tick only starts once `tick_interval_ms` has elapsed since the
//! previous one. Between `begin` and `end` the compute pass may be running on
//! the worker thread; registry operations made in that window are deferred
//! to the end of the tick.

use std::time::Instant;

use tracing::{info, warn};

use super::tick::{compute_tick, TickReport, TickSummary};
use super::worker::ComputeWorker;
use crate::core::{
    EntitySink, EntitySource, ExecutionMode, FollowConfig, FollowError, FollowResult,
};
use crate::follow::FollowRegistry;

enum Executor {
    Inline,
    Worker(ComputeWorker),
}

enum InFlight {
    /// Computed inline; the report is ready.
    Ready(TickReport),
    /// Submitted to the worker.
    Submitted(u64),
}

/// Owns the registry and drives its tick cycle.
pub struct FollowScheduler {
    registry: FollowRegistry,
    executor: Executor,
    parallel: bool,
    in_flight: Option<InFlight>,
    last_tick: Option<Instant>,
    shut_down: bool,
}

impl FollowScheduler {
    /// Validate `config` and start the executor it asks for.
    pub fn new(config: FollowConfig) -> FollowResult<Self> {
        config.validate()?;
        let parallel = config.execution == ExecutionMode::Parallel;
        let executor = match config.execution {
            ExecutionMode::Inline => Executor::Inline,
            ExecutionMode::Worker | ExecutionMode::Parallel => {
                Executor::Worker(ComputeWorker::spawn(parallel)?)
            }
        };
        info!(
            "follow scheduler ready: {:?} execution, {} ms interval",
            config.execution, config.tick_interval_ms
        );

        Ok(Self {
            registry: FollowRegistry::new(config),
            executor,
            parallel,
            in_flight: None,
            last_tick: None,
            shut_down: false,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &FollowRegistry {
        &self.registry
    }

    /// Mutable registry access. Safe mid-tick: structural changes are
    /// deferred until `end`.
    pub fn registry_mut(&mut self) -> &mut FollowRegistry {
        &mut self.registry
    }

    /// Where compute currently runs. A disconnected worker reports `Inline`.
    #[must_use]
    pub fn execution(&self) -> ExecutionMode {
        match (&self.executor, self.parallel) {
            (Executor::Inline, _) => ExecutionMode::Inline,
            (Executor::Worker(_), false) => ExecutionMode::Worker,
            (Executor::Worker(_), true) => ExecutionMode::Parallel,
        }
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn fall_back_to_inline(&mut self) {
        if let Executor::Worker(mut worker) = std::mem::replace(&mut self.executor, Executor::Inline)
        {
            worker.stop();
        }
        warn!("compute worker unavailable, computing inline from now on");
    }

    /// Start a tick if one is due.
    ///
    /// Returns false while a tick is in flight, after shutdown, when there
    /// are no sessions, or when the interval has not elapsed since the last
    /// tick started.
    pub fn begin(&mut self, now: Instant, world: &dyn EntitySource) -> bool {
        if self.shut_down || self.in_flight.is_some() || self.registry.is_empty() {
            return false;
        }
        if let Some(last) = self.last_tick {
            if now.saturating_duration_since(last) < self.registry.config().tick_interval() {
                return false;
            }
        }
        let Some(job) = self.registry.begin_tick(world) else {
            return false;
        };
        self.last_tick = Some(now);

        let in_flight = match &self.executor {
            Executor::Inline => InFlight::Ready(compute_tick(&job, self.parallel)),
            Executor::Worker(worker) => {
                let tick = job.tick;
                match worker.submit(job) {
                    Ok(()) => InFlight::Submitted(tick),
                    Err(job) => {
                        self.fall_back_to_inline();
                        InFlight::Ready(compute_tick(&job, self.parallel))
                    }
                }
            }
        };
        self.in_flight = Some(in_flight);
        true
    }

    /// Finish the tick in flight: wait for its report, apply it and flush
    /// pending changes. Returns `None` if no tick was in flight.
    pub fn end<H>(&mut self, host: &mut H) -> Option<TickSummary>
    where
        H: EntitySource + EntitySink,
    {
        let report = match self.in_flight.take()? {
            InFlight::Ready(report) => report,
            InFlight::Submitted(tick) => {
                let received = match &self.executor {
                    Executor::Worker(worker) => worker.wait(),
                    Executor::Inline => Err(FollowError::WorkerDisconnected),
                };
                match received {
                    Ok(report) => report,
                    Err(err) => {
                        warn!("tick {} lost: {}", tick, err);
                        self.fall_back_to_inline();
                        TickReport::empty(tick)
                    }
                }
            }
        };
        Some(self.registry.finish_tick(report, host))
    }

    /// `begin` followed by `end`.
    pub fn tick<H>(&mut self, now: Instant, host: &mut H) -> Option<TickSummary>
    where
        H: EntitySource + EntitySink,
    {
        if !self.begin(now, &*host) {
            return None;
        }
        self.end(host)
    }

    /// Stop ticking: finish any tick in flight, then join the worker.
    pub fn shutdown<H>(&mut self, host: &mut H) -> Option<TickSummary>
    where
        H: EntitySource + EntitySink,
    {
        self.shut_down = true;
        let summary = self.end(host);
        if let Executor::Worker(worker) = &mut self.executor {
            worker.stop();
        }
        self.executor = Executor::Inline;
        info!("follow scheduler shut down");
        summary
    }
}

impl std::fmt::Debug for FollowScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowScheduler")
            .field("execution", &self.execution())
            .field("in_flight", &self.is_in_flight())
            .field("shut_down", &self.shut_down)
            .field("sessions", &self.registry.len())
            .finish()
    }
}
