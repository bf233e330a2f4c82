//! Deadline-ordered job scheduler
//!
//! Jobs are short callbacks run by one dedicated loop thread, either as
//! soon as possible or once the tick counter reaches a deadline. Runnable
//! jobs run in submission order and always before due scheduled jobs.
//!
//! Queue mutation only enters the critical section and gives a semaphore,
//! so [`JobScheduler::set_immediate`], [`JobScheduler::set_timed`] and
//! [`JobScheduler::clear`] may be called from interrupt handlers. The queues
//! are sized when a job is created and never grow afterwards, but setting a
//! job boxes its callback and replacing one frees the old box: from an
//! interrupt handler this needs an interrupt-safe global allocator.
//!
//! Callbacks run outside the critical section but on the loop thread: a
//! callback that blocks or never returns stalls every other job.

mod job_list;

pub use job_list::JobState;

use alloc::sync::Arc;

use portable_atomic::{AtomicBool, Ordering};

use self::job_list::JobQueues;
use crate::config::{CFG_JOB_CORE, CFG_JOB_PRIO, CFG_JOB_STK_SIZE};
use crate::core::cs_cell::CsCell;
use crate::core::runtime::Runtime;
use crate::core::thread::attr::ThreadAttr;
use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::port::{BinarySemaphore, Kernel};
use crate::types::{OsTick, ThreadId, WAIT_FOREVER};

/// Handle to a job owned by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Job {
    index: u32,
    generation: u32,
}

/// Job callback; receives the job it was scheduled on
pub type JobCallback = Arc<dyn Fn(Job) + Send + Sync + 'static>;

/// Runnable and scheduled job queues plus the loop that drains them
pub struct JobScheduler<K: Kernel> {
    kernel: Arc<K>,
    queues: CsCell<JobQueues>,
    /// Given whenever the queues change
    wake: K::Semaphore,
    running: AtomicBool,
    stop: AtomicBool,
}

impl<K: Kernel> JobScheduler<K> {
    pub fn new(kernel: Arc<K>) -> OsResult<Self> {
        let wake = kernel.semaphore_create()?;
        Ok(JobScheduler {
            kernel,
            queues: CsCell::new(JobQueues::new()),
            wake,
            running: AtomicBool::new(false),
            stop: AtomicBool::new(false),
        })
    }

    /// Register a new idle job
    pub fn job(&self) -> Job {
        self.queues.lock(|q| q.alloc())
    }

    /// Unschedule a job and free its slot; the handle becomes stale
    pub fn release(&self, job: Job) -> OsResult<()> {
        self.queues.lock(|q| q.release(job))
    }

    /// Unschedule a job; no effect on an idle job
    pub fn clear(&self, job: Job) -> OsResult<()> {
        self.queues.lock(|q| q.unlink(job))?;
        self.wake.give();
        Ok(())
    }

    /// Run `callback` as soon as possible, after jobs already runnable
    pub fn set_immediate<F>(&self, job: Job, callback: F) -> OsResult<()>
    where
        F: Fn(Job) + Send + Sync + 'static,
    {
        let callback: JobCallback = Arc::new(callback);
        self.queues.lock(|q| q.push_runnable(job, callback))?;
        self.wake.give();
        Ok(())
    }

    /// Run `callback` once the tick counter reaches `deadline`
    ///
    /// Jobs with equal deadlines run in the order they were set.
    pub fn set_timed<F>(&self, job: Job, deadline: OsTick, callback: F) -> OsResult<()>
    where
        F: Fn(Job) + Send + Sync + 'static,
    {
        let callback: JobCallback = Arc::new(callback);
        self.queues.lock(|q| q.insert_scheduled(job, deadline, callback))?;
        self.wake.give();
        Ok(())
    }

    /// Where a job currently is
    pub fn state(&self, job: Job) -> OsResult<JobState> {
        self.queues.lock(|q| q.state(job))
    }

    /// `true` if the job waits in either queue
    pub fn is_pending(&self, job: Job) -> bool {
        matches!(self.state(job), Ok(JobState::Runnable | JobState::Scheduled(_)))
    }

    /// Run at most one ready job
    ///
    /// # Returns
    /// `true` if a job ran
    pub fn run_once(&self) -> bool {
        let now = self.kernel.tick_count();
        let ready = critical_section(|cs| self.queues.get(cs).pop_ready(now));

        match ready {
            Some((job, callback)) => {
                callback(job);
                true
            }
            None => false,
        }
    }

    /// Ticks the loop may sleep before the next deadline
    fn idle_timeout(&self) -> OsTick {
        let now = self.kernel.tick_count();
        let next = self.queues.lock(|q| if q.has_runnable() { Some(now) } else { q.next_deadline() });

        match next {
            None => WAIT_FOREVER,
            Some(deadline) => {
                let left = deadline.wrapping_sub(now) as i32;
                left.max(1) as OsTick
            }
        }
    }

    /// Drain the queues until [`stop`](Self::stop) is called
    ///
    /// # Returns
    /// `Err(Busy)` if another loop is already running
    pub fn run(&self) -> OsResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(OsError::Busy);
        }
        crate::info!("job loop started");

        while !self.stop.load(Ordering::Acquire) {
            if !self.run_once() {
                let timeout = self.idle_timeout();
                self.wake.take(timeout);
            }
        }

        self.stop.store(false, Ordering::Release);
        self.running.store(false, Ordering::Release);
        crate::info!("job loop stopped");
        Ok(())
    }

    /// Ask the loop to return after the job it is running
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.wake.give();
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl<K: Kernel> Runtime<K> {
    /// Default attributes of the job loop thread
    pub fn job_loop_attr() -> ThreadAttr {
        let mut attr = ThreadAttr::new();
        attr.set_name("jobs");
        // Out-of-range job constants fall back to the thread defaults
        let _ = attr.set_stack_size(CFG_JOB_STK_SIZE);
        let _ = attr.set_priority(CFG_JOB_PRIO);
        let _ = attr.set_affinity(CFG_JOB_CORE);
        attr
    }

    /// Spawn the thread that runs the job loop
    ///
    /// # Returns
    /// Handle of the (joinable) loop thread, `Err(Busy)` if a loop is
    /// already running
    pub fn job_loop_start(self: &Arc<Self>, attr: Option<&ThreadAttr>) -> OsResult<ThreadId> {
        if self.jobs.is_running() {
            return Err(OsError::Busy);
        }

        let attr = attr.copied().unwrap_or_else(Self::job_loop_attr);
        let rt = self.clone();
        self.thread_create(Some(&attr), move || match rt.jobs.run() {
            Ok(()) => 0,
            Err(e) => e.code() as usize,
        })
    }
}
