//! Controller: the job queue and its single worker.
//!
//! [`Controller`] owns the topology, a FIFO of pending
//! [`ActivationRequest`]s and the worker thread that drains it.  Exactly
//! one [`Sprinkle`] runs at a time, system-wide.
//!
//! ```text
//!  enqueue ──▶ ┌──────────────┐   pop    ┌──────────────┐
//!              │  JobState    │────────▶│  worker      │──▶ ActuatorPort
//!  cancel* ──▶ │  pending     │          │  Sprinkle    │──▶ AuditLog
//!              │  current ⚑   │◀────────│              │
//!              └──────────────┘  clear   └──────┬───────┘
//!                                               │ publish / clear
//!  status  ◀──────────── StatusCell ◀──────────┘
//! ```
//!
//! The pending queue and the current job's cancel token live under one
//! mutex, so `cancel_all` can clear the queue and trip the token without
//! an `enqueue` or a dequeue slipping in between.  Every public method
//! returns promptly; only the worker ever blocks on actuation.

use std::collections::{BTreeMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};

use log::{debug, error, info, warn};

use crate::config::TimingConfig;
use crate::error::Result;
use crate::fsm::{ActivationOutcome, ActivationPlan, Sprinkle};
use crate::topology::{Topology, normalize_zone};

use super::cancel::CancelToken;
use super::events::AuditLog;
use super::ports::{ActuatorPort, ControlPort};
use super::status::{ActiveJob, StatusCell, StatusSnapshot};

/// A queued activation.  Consumed by the worker once dequeued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    pub zone: String,
    pub duration_secs: u32,
}

#[derive(Default)]
struct JobState {
    pending: VecDeque<ActivationRequest>,
    /// Cancel token of the running activation, if any.
    current: Option<CancelToken>,
    stopping: bool,
}

struct Shared {
    topology: Topology,
    jobs: Mutex<JobState>,
    wake: Condvar,
    status: StatusCell,
}

impl Shared {
    fn jobs(&self) -> MutexGuard<'_, JobState> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Job queue plus the worker thread that executes it.
pub struct Controller {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    grace: Duration,
}

impl Controller {
    /// Start the worker thread.
    ///
    /// The actuator and audit sinks move onto the worker; nothing else
    /// touches GPIO state while the controller runs.
    pub fn start<A>(
        topology: Topology,
        actuator: A,
        audit: AuditLog,
        timing: TimingConfig,
    ) -> Result<Self>
    where
        A: ActuatorPort + Send + 'static,
    {
        info!("Starting: Controller ({} zones)", topology.len());
        for valve in topology.valves() {
            debug!(
                "{}: pin {} master {:?} ({})",
                valve.zone,
                valve.pin,
                valve.master_pin(),
                valve.description
            );
        }

        let shared = Arc::new(Shared {
            topology,
            jobs: Mutex::new(JobState::default()),
            wake: Condvar::new(),
            status: StatusCell::new(),
        });

        let worker_shared = shared.clone();
        let handle = std::thread::Builder::new()
            .name("queue-monitor".into())
            .spawn(move || run_worker(&worker_shared, actuator, audit, timing))?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
            grace: timing.shutdown_grace(),
        })
    }

    /// Append an activation to the queue.  Unknown zones are dropped.
    pub fn enqueue(&self, zone: &str, duration_secs: u32) -> bool {
        let Some(valve) = self.shared.topology.get(zone) else {
            info!("Ignoring request for unknown zone {}", normalize_zone(zone));
            return false;
        };
        let request = ActivationRequest {
            zone: valve.zone.clone(),
            duration_secs,
        };

        let mut jobs = self.shared.jobs();
        if jobs.stopping {
            warn!("Controller shutting down, dropping {}", request.zone);
            return false;
        }
        debug!("Queued {} for {}", request.zone, request.duration_secs);
        jobs.pending.push_back(request);
        self.shared.status.set_queue_depth(jobs.pending.len());
        drop(jobs);
        self.shared.wake.notify_one();
        true
    }

    /// Lock-free status read.
    pub fn current_status(&self) -> StatusSnapshot {
        self.shared.status.snapshot()
    }

    /// Stop the running activation; queued jobs still run afterwards.
    pub fn cancel_current(&self) {
        let jobs = self.shared.jobs();
        Self::cancel_running(&jobs);
    }

    /// Clear the queue, then stop the running activation.
    pub fn cancel_all(&self) {
        let mut jobs = self.shared.jobs();
        let dropped = jobs.pending.len();
        jobs.pending.clear();
        self.shared.status.set_queue_depth(0);
        Self::cancel_running(&jobs);
        info!("Cancelled all operations ({} queued jobs dropped)", dropped);
    }

    fn cancel_running(jobs: &JobState) {
        if let Some(token) = &jobs.current {
            if token.cancel() {
                info!("Cancelling current operation");
            }
        }
    }

    pub fn stations(&self) -> BTreeMap<String, String> {
        self.shared.topology.stations()
    }

    pub fn topology(&self) -> &Topology {
        &self.shared.topology
    }

    /// Whether the worker thread is still alive.
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop the worker: clear the queue, cancel the running job and wait
    /// up to the grace period for the thread to exit.  Safe to call more
    /// than once.
    pub fn shutdown(&self) {
        {
            let mut jobs = self.shared.jobs();
            if !jobs.stopping {
                info!("Controller shutting down");
                jobs.stopping = true;
                jobs.pending.clear();
                self.shared.status.set_queue_depth(0);
                Self::cancel_running(&jobs);
            }
        }
        self.shared.wake.notify_all();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return;
        };

        let deadline = Instant::now() + self.grace;
        while !handle.is_finished() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        if handle.is_finished() {
            if handle.join().is_err() {
                error!("Queue monitor thread panicked");
            }
            info!("Controller has shutdown");
        } else {
            warn!(
                "Queue monitor still busy after {:?}, detaching",
                self.grace
            );
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ControlPort for Controller {
    fn enqueue(&self, zone: &str, duration_secs: u32) -> bool {
        Controller::enqueue(self, zone, duration_secs)
    }

    fn current_status(&self) -> StatusSnapshot {
        Controller::current_status(self)
    }

    fn cancel_current(&self) {
        Controller::cancel_current(self);
    }

    fn cancel_all(&self) {
        Controller::cancel_all(self);
    }

    fn stations(&self) -> BTreeMap<String, String> {
        Controller::stations(self)
    }
}

// ── Worker ────────────────────────────────────────────────────

/// Block until a job is available or shutdown is requested.  On success
/// the job's cancel token is already installed as `current`.
fn next_job(shared: &Shared, idle_poll: Duration) -> Option<(ActivationRequest, CancelToken, usize)> {
    let mut jobs = shared.jobs();
    loop {
        if jobs.stopping {
            return None;
        }
        if let Some(request) = jobs.pending.pop_front() {
            let token = CancelToken::new();
            jobs.current = Some(token.clone());
            let depth = jobs.pending.len();
            shared.status.set_queue_depth(depth);
            return Some((request, token, depth));
        }
        jobs = shared
            .wake
            .wait_timeout(jobs, idle_poll)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
    }
}

fn run_worker<A: ActuatorPort>(
    shared: &Shared,
    mut actuator: A,
    mut audit: AuditLog,
    timing: TimingConfig,
) {
    debug!("Starting queue monitor");

    while let Some((request, cancel, depth)) = next_job(shared, timing.idle_poll()) {
        match shared.topology.get(&request.zone) {
            Some(valve) => {
                let plan = ActivationPlan::for_valve(valve, request.duration_secs);
                shared.status.publish(ActiveJob {
                    zone: plan.zone.clone(),
                    duration_secs: plan.duration_secs,
                    start_time: SystemTime::now(),
                    queue_depth_at_start: depth,
                });
                info!("STARTED: {} - {}", plan.zone, plan.duration_secs);

                let result = catch_unwind(AssertUnwindSafe(|| {
                    Sprinkle::new(plan, timing, &mut actuator, &mut audit).run(&cancel)
                }));
                match result {
                    Ok(ActivationOutcome::Completed) => info!("STOPPED: {}", request.zone),
                    Ok(ActivationOutcome::Cancelled) => {
                        info!("STOPPED: {} (cancelled)", request.zone);
                    }
                    Err(_) => error!("Activation of {} panicked", request.zone),
                }
                shared.status.clear();
            }
            None => warn!("Dropping job for unknown zone {}", request.zone),
        }

        shared.jobs().current = None;
    }

    debug!("Queue monitor has shutdown");
}
