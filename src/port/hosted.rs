//! Hosted port on top of `std::thread`
//!
//! Used on development hosts and by the test suite. Priorities and
//! affinity are validated but otherwise left to the host scheduler.

use std::cell::Cell;
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use portable_atomic::{AtomicU32, Ordering};

use super::{BinarySemaphore, Kernel, TaskEntry, TaskParams};
use crate::config::{CFG_NUM_CORES, CFG_PRIO_MAX, CFG_PRIO_MIN, CFG_STK_SIZE_MIN, CFG_TICK_RATE_HZ};
use crate::error::{OsError, OsResult};
use crate::types::{OsTick, TaskId, NO_WAIT, WAIT_FOREVER};

/// Host threads need more stack than the target's minimum
const HOST_STK_SIZE_MIN: usize = 64 * 1024;

static NEXT_TASK_ID: AtomicU32 = AtomicU32::new(1);

std::thread_local! {
    static CURRENT_TASK: Cell<u32> = const { Cell::new(0) };
}

fn alloc_task_id() -> u32 {
    NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed)
}

fn ticks_to_duration(ticks: OsTick) -> Duration {
    Duration::from_micros(ticks as u64 * 1_000_000 / CFG_TICK_RATE_HZ as u64)
}

// ============ Semaphore ============

/// Binary semaphore built from a flag and a condition variable
pub struct HostSemaphore {
    available: Mutex<bool>,
    cv: Condvar,
}

impl HostSemaphore {
    pub fn new() -> Self {
        HostSemaphore {
            available: Mutex::new(false),
            cv: Condvar::new(),
        }
    }
}

impl Default for HostSemaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl BinarySemaphore for HostSemaphore {
    fn take(&self, timeout: OsTick) -> bool {
        let mut available = self.available.lock().unwrap_or_else(|e| e.into_inner());

        if timeout == WAIT_FOREVER {
            while !*available {
                available = self.cv.wait(available).unwrap_or_else(|e| e.into_inner());
            }
        } else if timeout != NO_WAIT {
            let deadline = Instant::now() + ticks_to_duration(timeout);
            while !*available {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                available = self
                    .cv
                    .wait_timeout(available, deadline - now)
                    .unwrap_or_else(|e| e.into_inner())
                    .0;
            }
        }

        let taken = *available;
        *available = false;
        taken
    }

    fn give(&self) {
        let mut available = self.available.lock().unwrap_or_else(|e| e.into_inner());
        *available = true;
        self.cv.notify_one();
    }
}

// ============ Kernel ============

enum TickSource {
    Clock(Instant),
    Manual(AtomicU32),
}

/// Kernel adapter backed by host threads
pub struct HostKernel {
    ticks: TickSource,
}

impl HostKernel {
    /// Ticks follow the wall clock at `CFG_TICK_RATE_HZ`
    pub fn new() -> Self {
        HostKernel {
            ticks: TickSource::Clock(Instant::now()),
        }
    }

    /// Ticks only move when [`advance`](Self::advance) or
    /// [`set_ticks`](Self::set_ticks) is called
    pub fn with_manual_ticks() -> Self {
        HostKernel {
            ticks: TickSource::Manual(AtomicU32::new(0)),
        }
    }

    /// Move a manual tick counter forward; no effect on a clock source
    pub fn advance(&self, ticks: OsTick) {
        if let TickSource::Manual(t) = &self.ticks {
            t.fetch_add(ticks, Ordering::AcqRel);
        }
    }

    /// Set a manual tick counter; no effect on a clock source
    pub fn set_ticks(&self, ticks: OsTick) {
        if let TickSource::Manual(t) = &self.ticks {
            t.store(ticks, Ordering::Release);
        }
    }
}

impl Default for HostKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for HostKernel {
    type Semaphore = HostSemaphore;

    fn semaphore_create(&self) -> OsResult<HostSemaphore> {
        Ok(HostSemaphore::new())
    }

    fn task_create(&self, params: &TaskParams, entry: TaskEntry) -> OsResult<TaskId> {
        if params.stack_size < CFG_STK_SIZE_MIN {
            return Err(OsError::StkSizeInvalid);
        }
        if !(CFG_PRIO_MIN..CFG_PRIO_MAX).contains(&params.priority) {
            return Err(OsError::PrioInvalid);
        }
        if matches!(params.affinity, Some(core) if core >= CFG_NUM_CORES) {
            return Err(OsError::AffinityInvalid);
        }

        let id = alloc_task_id();
        thread::Builder::new()
            .name(params.name.into())
            .stack_size(params.stack_size.max(HOST_STK_SIZE_MIN))
            .spawn(move || {
                CURRENT_TASK.with(|c| c.set(id));
                entry();
            })
            .map_err(|_| OsError::TaskCreate)?;

        Ok(TaskId(id))
    }

    fn current_task(&self) -> TaskId {
        // Threads not spawned through this kernel get an id on first use
        let id = CURRENT_TASK.with(|c| {
            if c.get() == 0 {
                c.set(alloc_task_id());
            }
            c.get()
        });
        TaskId(id)
    }

    fn tick_count(&self) -> OsTick {
        match &self.ticks {
            TickSource::Clock(start) => {
                let elapsed = start.elapsed().as_micros() as u64;
                (elapsed * CFG_TICK_RATE_HZ as u64 / 1_000_000) as OsTick
            }
            TickSource::Manual(t) => t.load(Ordering::Acquire),
        }
    }

    fn defer_to_thread(&self, f: TaskEntry) -> OsResult<()> {
        thread::Builder::new()
            .name("deferred".into())
            .stack_size(HOST_STK_SIZE_MIN)
            .spawn(f)
            .map(|_| ())
            .map_err(|_| OsError::TaskCreate)
    }
}
