//! Worker runner (C6) — replaces `threadpoll.c`'s `thpool`.
//!
//! The C original dispatches exactly one long-lived task per worker rather
//! than pulling work from a shared queue: each thread's `poll_func` *is* its
//! entire job for the life of the process. The Design Notes in
//! `SPEC_FULL.md` call for keeping that semantics but naming it honestly —
//! "worker runner", not "thread pool" — since there is no task queue here to
//! ever contend over.
//!
//! Each worker thread blocks on its own private task slot
//! (`Mutex<Option<Task>> + Condvar`) until [`WorkerRunner::submit`] hands it
//! a task. `init` spawns the threads; `submit` is then called once per
//! worker by the orchestrator immediately afterward — never again.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::error::{CoreError, CoreResult};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle states, matching `SPEC_FULL.md` §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Created,
    Initialized,
    Running,
    Draining,
    Shutdown,
}

/// A slot's task plus whether it has ever been assigned. The "ever
/// assigned" bit is distinct from `task.is_some()`: once a worker consumes
/// its task via `wait_for_task`, `task` goes back to `None`, but the slot
/// must never be handed a second task — its worker is gone for good into
/// the task's own run loop and will never call `wait_for_task` again.
struct SlotState {
    assigned: bool,
    task: Option<Task>,
}

struct Slot {
    state: Mutex<SlotState>,
    condvar: Condvar,
}

impl Slot {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState {
                assigned: false,
                task: None,
            }),
            condvar: Condvar::new(),
        })
    }

    /// Blocks until a task is assigned, then returns it.
    fn wait_for_task(&self) -> Task {
        let mut guard = self.state.lock().unwrap();
        while guard.task.is_none() {
            guard = self.condvar.wait(guard).unwrap();
        }
        guard.task.take().unwrap()
    }

    /// Assigns `task` if the slot has never been assigned one before.
    /// Returns the task back if it was already assigned, regardless of
    /// whether that earlier task has since been consumed.
    fn try_assign(&self, task: Task) -> Option<Task> {
        let mut guard = self.state.lock().unwrap();
        if guard.assigned {
            return Some(task);
        }
        guard.assigned = true;
        guard.task = Some(task);
        self.condvar.notify_one();
        None
    }
}

/// A fixed set of worker threads, each running exactly one supplied task
/// function for its entire lifetime.
pub struct WorkerRunner {
    size: usize,
    state: Mutex<PoolState>,
    slots: Vec<Arc<Slot>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerRunner {
    /// Allocates the control block for `n` workers. No threads exist yet.
    pub fn create(n: usize) -> Self {
        Self {
            size: n,
            state: Mutex::new(PoolState::Created),
            slots: (0..n).map(|_| Slot::new()).collect(),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> PoolState {
        *self.state.lock().unwrap()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Spawns `n` worker threads, each blocking immediately on its private
    /// slot until [`Self::submit`] assigns it a task.
    pub fn init(&self) -> CoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if *state != PoolState::Created {
            return Err(CoreError::Internal(
                "init called outside Created state".into(),
            ));
        }

        let mut handles = self.handles.lock().unwrap();
        for slot in &self.slots {
            let slot = slot.clone();
            handles.push(
                std::thread::Builder::new()
                    .name("vaultd-worker".into())
                    .spawn(move || {
                        let task = slot.wait_for_task();
                        task();
                    })
                    .map_err(CoreError::SystemIO)?,
            );
        }
        *state = PoolState::Initialized;
        Ok(())
    }

    /// Hands `task` to the first worker slot that has never been assigned a
    /// task and wakes it. Per `SPEC_FULL.md` §4.6, this is called exactly
    /// once per worker, by the orchestrator, right after `init`. Tracking
    /// "ever assigned" rather than "currently empty" is what makes each
    /// `submit` call land on a distinct worker regardless of how fast that
    /// worker wakes and consumes its task.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> CoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if !matches!(*state, PoolState::Initialized | PoolState::Running) {
            return Err(CoreError::Internal(
                "submit called before init or after shutdown".into(),
            ));
        }

        let mut remaining: Task = Box::new(task);
        for slot in &self.slots {
            match slot.try_assign(remaining) {
                None => {
                    *state = PoolState::Running;
                    return Ok(());
                }
                Some(back) => remaining = back,
            }
        }
        Err(CoreError::Full)
    }

    /// Joins every worker thread. Callers are responsible for having already
    /// flipped whatever `running` flag each worker's task observes — this
    /// runner has no opinion on what that flag is, only that `shutdown`
    /// blocks until every thread has returned.
    pub fn shutdown(&self) -> CoreResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            if *state == PoolState::Shutdown {
                return Ok(());
            }
            *state = PoolState::Draining;
        }
        let handles = std::mem::take(&mut *self.handles.lock().unwrap());
        for handle in handles {
            handle
                .join()
                .map_err(|_| CoreError::Internal("worker thread panicked".into()))?;
        }
        *self.state.lock().unwrap() = PoolState::Shutdown;
        Ok(())
    }

    /// Precondition: [`Self::shutdown`] has already returned. Kept as an
    /// explicit call for symmetry with the other components' teardown
    /// vocabulary — in Rust the control block is released by `Drop`
    /// regardless.
    pub fn destroy(self) -> CoreResult<()> {
        if self.state() != PoolState::Shutdown {
            return Err(CoreError::Internal(
                "destroy called before shutdown completed".into(),
            ));
        }
        Ok(())
    }
}
