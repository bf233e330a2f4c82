//! Thread lifecycle management
//!
//! Threads are kernel tasks with a record in the runtime's thread table:
//!
//! ```text
//! created -> running -> exited(value) -> reclaimed (join)
//!                    \-> reclaimed (detached)
//! ```
//!
//! A joinable thread keeps its record, and its exit value, until it is
//! joined or detached. Thread ids are never reused, so a handle whose record
//! is gone is reported as `InvalidState` rather than `NotFound`.

pub mod attr;
pub mod key;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::core::runtime::Runtime;
use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::port::{BinarySemaphore, Kernel};
use crate::types::{CancelState, DetachState, InitialState, OsExitVal, TaskId, ThreadId, WAIT_FOREVER};

use self::attr::ThreadAttr;

/// Cleanup handler registered with [`Runtime::cleanup_push`]
pub type CleanupFn = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle state of a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ThreadStatus {
    /// Kernel task requested, not started yet
    Created,
    Running,
    /// Finished; value kept for `join`
    Exited(OsExitVal),
}

struct ThreadRecord<S> {
    task: Option<TaskId>,
    status: ThreadStatus,
    detach: DetachState,
    cancel: CancelState,
    joining: bool,
    /// Given once when the thread exits
    done: Arc<S>,
    /// Present until a suspended thread is resumed
    resume: Option<Arc<S>>,
    cleanup: Vec<CleanupFn>,
}

pub(crate) struct ThreadTable<S> {
    next_id: u32,
    records: BTreeMap<ThreadId, ThreadRecord<S>>,
}

impl<S> ThreadTable<S> {
    pub(crate) const fn new() -> Self {
        ThreadTable {
            next_id: 1,
            records: BTreeMap::new(),
        }
    }

    fn record_mut(&mut self, id: ThreadId) -> OsResult<&mut ThreadRecord<S>> {
        let issued = id.0 != 0 && id.0 < self.next_id;
        self.records
            .get_mut(&id)
            .ok_or(if issued { OsError::InvalidState } else { OsError::NotFound })
    }

    fn by_task(&mut self, task: TaskId) -> Option<(ThreadId, &mut ThreadRecord<S>)> {
        self.records
            .iter_mut()
            .find(|(_, r)| r.task == Some(task))
            .map(|(id, r)| (*id, r))
    }
}

impl<K: Kernel> Runtime<K> {
    /// Create a thread running `entry`
    ///
    /// Returns once the new thread has started and run its init routine.
    ///
    /// # Arguments
    /// * `attr` - attributes, or the runtime defaults when `None`
    /// * `entry` - thread body; its return value is the exit value
    ///
    /// # Returns
    /// The thread handle, or the kernel's error unchanged
    pub fn thread_create<F>(self: &Arc<Self>, attr: Option<&ThreadAttr>, entry: F) -> OsResult<ThreadId>
    where
        F: FnOnce() -> OsExitVal + Send + 'static,
    {
        if is_isr_context() {
            return Err(OsError::CreateIsr);
        }

        let attr = attr.copied().unwrap_or_else(|| ThreadAttr::from_config(&self.config));
        if matches!(attr.affinity(), Some(core) if core >= self.config.num_cores) {
            return Err(OsError::Invalid);
        }

        let started = Arc::new(self.kernel.semaphore_create()?);
        let done = Arc::new(self.kernel.semaphore_create()?);
        let resume = match attr.initial_state() {
            InitialState::Suspended => Some(Arc::new(self.kernel.semaphore_create()?)),
            InitialState::Run => None,
        };

        let id = self.threads.lock(|table| {
            let id = ThreadId(table.next_id);
            table.next_id += 1;
            table.records.insert(
                id,
                ThreadRecord {
                    task: None,
                    status: ThreadStatus::Created,
                    detach: attr.detach_state(),
                    cancel: CancelState::Enable,
                    joining: false,
                    done,
                    resume: resume.clone(),
                    cleanup: Vec::new(),
                },
            );
            id
        });

        let rt = self.clone();
        let child_started = started.clone();
        let init_fn = attr.init_fn();
        let trampoline = move || {
            let task = rt.kernel.current_task();
            rt.threads.lock(|table| {
                if let Some(record) = table.records.get_mut(&id) {
                    record.task = Some(task);
                    record.status = ThreadStatus::Running;
                }
            });

            if let Some(init) = init_fn {
                init();
            }
            child_started.give();

            if let Some(resume) = resume {
                resume.take(WAIT_FOREVER);
            }

            let value = entry();
            rt.thread_exit(id, task, value);
        };

        if let Err(e) = self.kernel.task_create(&attr.task_params(), Box::new(trampoline)) {
            crate::error!("thread {} create failed: {}", id.0, e.code());
            self.threads.lock(|table| table.records.remove(&id));
            return Err(e);
        }

        started.take(WAIT_FOREVER);
        crate::debug!("thread {} created, prio {}", id.0, attr.priority());
        Ok(id)
    }

    fn thread_exit(&self, id: ThreadId, task: TaskId, value: OsExitVal) {
        // Handlers left on the stack run last-pushed first
        let mut handlers = self
            .threads
            .lock(|table| table.records.get_mut(&id).map(|r| core::mem::take(&mut r.cleanup)))
            .unwrap_or_default();
        while let Some(handler) = handlers.pop() {
            handler();
        }

        self.key_thread_exit(task);

        let done = critical_section(|cs| {
            let mut table = self.threads.get(cs);
            let detached = match table.records.get_mut(&id) {
                Some(record) if record.detach == DetachState::Joinable => {
                    record.status = ThreadStatus::Exited(value);
                    return Some(record.done.clone());
                }
                Some(_) => true,
                None => false,
            };
            if detached {
                table.records.remove(&id);
            }
            None
        });

        if let Some(done) = done {
            done.give();
        }
        crate::debug!("thread {} exited", id.0);
    }

    /// Wait for a joinable thread to exit and reclaim it
    ///
    /// # Returns
    /// The thread's exit value; `Err(InvalidState)` for detached threads,
    /// a second concurrent join, or joining oneself
    pub fn thread_join(&self, id: ThreadId) -> OsResult<OsExitVal> {
        if is_isr_context() {
            return Err(OsError::PendIsr);
        }

        let me = self.kernel.current_task();
        let done = self.threads.lock(|table| {
            let record = table.record_mut(id)?;
            if record.detach == DetachState::Detached || record.joining || record.task == Some(me) {
                return Err(OsError::InvalidState);
            }
            record.joining = true;
            Ok(record.done.clone())
        })?;

        done.take(WAIT_FOREVER);

        let record = self.threads.lock(|table| table.records.remove(&id));
        match record.map(|r| r.status) {
            Some(ThreadStatus::Exited(value)) => {
                crate::debug!("thread {} joined", id.0);
                Ok(value)
            }
            _ => Err(OsError::InvalidState),
        }
    }

    /// Mark a thread detached; an already exited thread is reclaimed now
    pub fn thread_detach(&self, id: ThreadId) -> OsResult<()> {
        self.threads.lock(|table| {
            let record = table.record_mut(id)?;
            if record.detach == DetachState::Detached || record.joining {
                return Err(OsError::InvalidState);
            }
            let exited = matches!(record.status, ThreadStatus::Exited(_));
            if !exited {
                record.detach = DetachState::Detached;
            } else {
                table.records.remove(&id);
            }
            Ok(())
        })
    }

    /// Start a thread created with [`InitialState::Suspended`]
    pub fn thread_resume(&self, id: ThreadId) -> OsResult<()> {
        let resume = self.threads.lock(|table| {
            let record = table.record_mut(id)?;
            record.resume.take().ok_or(OsError::InvalidState)
        })?;
        resume.give();
        Ok(())
    }

    /// Handle of the calling thread, `None` for tasks not created here
    pub fn thread_self(&self) -> Option<ThreadId> {
        let me = self.kernel.current_task();
        self.threads.lock(|table| table.by_task(me).map(|(id, _)| id))
    }

    /// Lifecycle state of a thread
    pub fn thread_status(&self, id: ThreadId) -> OsResult<ThreadStatus> {
        self.threads.lock(|table| table.record_mut(id).map(|r| r.status))
    }

    /// Push a handler run when the calling thread exits
    ///
    /// # Returns
    /// `Err(NotFound)` when not called from a runtime thread
    pub fn cleanup_push<F>(&self, routine: F) -> OsResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let me = self.kernel.current_task();
        let routine: CleanupFn = Box::new(routine);
        self.threads.lock(|table| {
            let (_, record) = table.by_task(me).ok_or(OsError::NotFound)?;
            record.cleanup.push(routine);
            Ok(())
        })
    }

    /// Pop the most recent cleanup handler, running it if `execute`
    ///
    /// # Returns
    /// `true` if a handler was popped
    pub fn cleanup_pop(&self, execute: bool) -> OsResult<bool> {
        let me = self.kernel.current_task();
        let handler = self.threads.lock(|table| -> OsResult<Option<CleanupFn>> {
            let (_, record) = table.by_task(me).ok_or(OsError::NotFound)?;
            Ok(record.cleanup.pop())
        })?;

        match handler {
            Some(handler) => {
                if execute {
                    handler();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Record the calling thread's cancellation state
    ///
    /// Cancellation is not implemented; the state is kept only so it can
    /// be read back.
    ///
    /// # Returns
    /// The previous state
    pub fn set_cancel_state(&self, state: CancelState) -> OsResult<CancelState> {
        let me = self.kernel.current_task();
        self.threads.lock(|table| {
            let (_, record) = table.by_task(me).ok_or(OsError::NotFound)?;
            Ok(core::mem::replace(&mut record.cancel, state))
        })
    }
}
