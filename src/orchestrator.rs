use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::catalogue::{Action, TaskResult};

pub const STAGGER_SLOTS: usize = 4;
pub const STAGGER_STEP: Duration = Duration::from_millis(50);
pub const RESULT_CHANNEL_CAPACITY: usize = 20;

/// One selected task, resolved to its execution unit.
#[derive(Clone)]
pub struct Job {
    pub index: usize,
    pub name: String,
    pub parallel: bool,
    pub action: Arc<dyn Action>,
}

/// A delivered result, tagged with the catalogue index it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub index: usize,
    pub result: TaskResult,
}

/// Start offset for a job. Staggered jobs spread over `STAGGER_SLOTS` slots
/// keyed by catalogue index; heavy jobs start immediately.
pub fn stagger_delay(index: usize, parallel: bool) -> Duration {
    if !parallel {
        return Duration::ZERO;
    }
    STAGGER_STEP * (index % STAGGER_SLOTS) as u32
}

/// Counts outstanding invocations; `wait` returns once every `add` is matched by `done`.
#[derive(Clone, Default)]
pub struct WaitGroup {
    state: Arc<(Mutex<usize>, Condvar)>,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, count: usize) {
        let (lock, _) = &*self.state;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) += count;
    }

    pub fn done(&self) {
        let (lock, cvar) = &*self.state;
        let mut pending = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            cvar.notify_all();
        }
    }

    pub fn pending(&self) -> usize {
        let (lock, _) = &*self.state;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn wait(&self) {
        let (lock, cvar) = &*self.state;
        let pending = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _pending = cvar
            .wait_while(pending, |pending| *pending > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Returns true if the group drained before `timeout` elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.state;
        let pending = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (pending, _) = cvar
            .wait_timeout_while(pending, timeout, |pending| *pending > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *pending == 0
    }
}

/// Marks one invocation done when dropped, including on unwind.
struct DoneGuard(WaitGroup);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.done();
    }
}

/// Consumer side of a run. Results are pulled one at a time; the producer
/// side is tracked independently by the wait group.
pub struct RunHandle {
    receiver: Receiver<TaskOutcome>,
    wait_group: WaitGroup,
    cancel: Arc<AtomicBool>,
    launched: usize,
}

impl RunHandle {
    /// Non-blocking poll for the next delivered result.
    pub fn try_next(&self) -> Option<TaskOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    #[cfg(test)]
    pub fn next_timeout(&self, timeout: Duration) -> Option<TaskOutcome> {
        self.receiver.recv_timeout(timeout).ok()
    }

    pub fn launched(&self) -> usize {
        self.launched
    }

    /// Invocations that have not yet delivered their result.
    pub fn in_flight(&self) -> usize {
        self.wait_group.pending()
    }

    /// True once every spawned invocation finished, whether or not its
    /// result has been drained.
    pub fn is_exhausted(&self) -> bool {
        self.in_flight() == 0
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Cancels the run and waits up to `grace` for in-flight invocations.
    /// Returns how many were still running when the grace period ended.
    pub fn shutdown(&self, grace: Duration) -> usize {
        self.cancel();
        if self.wait_group.wait_timeout(grace) {
            0
        } else {
            self.in_flight()
        }
    }
}

pub struct Orchestrator {
    capacity: usize,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self {
            capacity: RESULT_CHANNEL_CAPACITY,
        }
    }
}

impl Orchestrator {
    #[cfg(test)]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Spawns one worker per job and returns the handle results arrive on.
    pub fn start(&self, jobs: Vec<Job>) -> RunHandle {
        // The buffer must hold every result so a slow consumer never blocks a worker.
        let capacity = self.capacity.max(jobs.len());
        let (tx, receiver) = mpsc::sync_channel(capacity);
        let wait_group = WaitGroup::new();
        let cancel = Arc::new(AtomicBool::new(false));
        let launched = jobs.len();
        let started_at = Instant::now();

        info!(tasks = launched, capacity, "starting run");
        wait_group.add(launched);
        for job in jobs {
            spawn_worker(job, tx.clone(), wait_group.clone(), Arc::clone(&cancel));
        }
        drop(tx);

        let watcher = wait_group.clone();
        let spawned = thread::Builder::new()
            .name("run-coordinator".to_string())
            .spawn(move || {
                watcher.wait();
                info!(
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    "run exhausted"
                );
            });
        if let Err(err) = spawned {
            warn!(error = %err, "could not spawn run coordinator");
        }

        RunHandle {
            receiver,
            wait_group,
            cancel,
            launched,
        }
    }
}

fn spawn_worker(
    job: Job,
    tx: SyncSender<TaskOutcome>,
    wait_group: WaitGroup,
    cancel: Arc<AtomicBool>,
) {
    let index = job.index;
    let fallback_tx = tx.clone();
    let guard = DoneGuard(wait_group);
    let spawned = thread::Builder::new()
        .name(format!("task-{index}"))
        .spawn(move || {
            let _guard = guard;
            let delay = stagger_delay(job.index, job.parallel);
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            let result = if cancel.load(Ordering::SeqCst) {
                TaskResult::failed("cancelled before start")
            } else {
                let started_at = Instant::now();
                let result = run_guarded(job.action.as_ref());
                debug!(
                    task = %job.name,
                    index = job.index,
                    success = result.success,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    "task finished"
                );
                result
            };
            // The consumer may already be gone after a forced quit.
            let _ = tx.send(TaskOutcome {
                index: job.index,
                result,
            });
        });
    if let Err(err) = spawned {
        // The closure (and the guard inside it) was dropped, so the wait group
        // is already settled; the result still has to be delivered.
        warn!(index, error = %err, "could not spawn task worker");
        let _ = fallback_tx.send(TaskOutcome {
            index,
            result: TaskResult::failed(format!("worker failed to start: {err}")),
        });
    }
}

fn run_guarded(action: &dyn Action) -> TaskResult {
    panic::catch_unwind(AssertUnwindSafe(|| action.run())).unwrap_or_else(|payload| {
        TaskResult::failed(format!("action panicked: {}", panic_message(&*payload)))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "../tests/unit/orchestrator_tests.rs"]
mod tests;
