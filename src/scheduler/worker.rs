//! Dedicated compute thread.
//!
//! Jobs go in over one channel and reports come back over another. The
//! thread runs one job at a time, so at most one report is ever waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::tick::{compute_tick, ComputeJob, TickReport};
use crate::core::{FollowError, FollowResult};

/// Handle to the compute thread.
pub struct ComputeWorker {
    jobs: Option<Sender<ComputeJob>>,
    reports: Receiver<TickReport>,
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl ComputeWorker {
    /// Spawn the thread. With `parallel`, each job fans out across sessions
    /// on the rayon pool.
    pub fn spawn(parallel: bool) -> FollowResult<Self> {
        let (job_tx, job_rx) = mpsc::channel::<ComputeJob>();
        let (report_tx, report_rx) = mpsc::channel::<TickReport>();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("follow-compute".to_string())
            .spawn(move || {
                debug!("compute worker started (parallel: {})", parallel);
                while let Ok(job) = job_rx.recv() {
                    let report = compute_tick(&job, parallel);
                    if report_tx.send(report).is_err() {
                        break;
                    }
                }
                flag.store(false, Ordering::Release);
                debug!("compute worker exited");
            })
            .map_err(|e| FollowError::WorkerSpawn(e.to_string()))?;

        info!("started compute worker thread");
        Ok(Self {
            jobs: Some(job_tx),
            reports: report_rx,
            handle: Some(handle),
            running,
        })
    }

    /// Whether the thread is still accepting jobs.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.jobs.is_some() && self.running.load(Ordering::Acquire)
    }

    /// Hand a job to the thread. The job comes back if the thread is gone.
    pub fn submit(&self, job: ComputeJob) -> Result<(), ComputeJob> {
        match &self.jobs {
            Some(sender) => sender.send(job).map_err(|err| err.0),
            None => Err(job),
        }
    }

    /// Block until the report of the last submitted job arrives.
    pub fn wait(&self) -> FollowResult<TickReport> {
        self.reports
            .recv()
            .map_err(|_| FollowError::WorkerDisconnected)
    }

    /// Close the job channel and join the thread.
    ///
    /// A job already submitted is finished first; its report is discarded.
    pub fn stop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("compute worker thread panicked");
            } else {
                info!("stopped compute worker thread");
            }
        }
        self.running.store(false, Ordering::Release);
    }
}

impl Drop for ComputeWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ComputeWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeWorker")
            .field("running", &self.is_running())
            .finish()
    }
}
