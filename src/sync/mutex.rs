//! Mutex built on a kernel binary semaphore
//!
//! Non-recursive. The semaphore is created by [`Mutex::init`] or lazily on
//! the first lock. Ownership is tracked for diagnostics only: unlocking a
//! mutex held by another task succeeds, as the original kernel API does,
//! but is logged.

use alloc::sync::Arc;

use crate::core::cs_cell::CsCell;
use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::port::{BinarySemaphore, Kernel};
use crate::types::{OsTick, TaskId, NO_WAIT, WAIT_FOREVER};

struct MutexState<S> {
    /// `None` until initialized
    sem: Option<Arc<S>>,
    /// Task that last acquired the mutex
    owner: Option<TaskId>,
    /// Condition variables currently waiting with this mutex
    cond_refs: u32,
}

/// Mutual exclusion lock
pub struct Mutex<K: Kernel> {
    kernel: Arc<K>,
    state: CsCell<MutexState<K::Semaphore>>,
}

impl<K: Kernel> Mutex<K> {
    /// Create an uninitialized mutex
    pub fn new(kernel: Arc<K>) -> Self {
        Mutex {
            kernel,
            state: CsCell::new(MutexState {
                sem: None,
                owner: None,
                cond_refs: 0,
            }),
        }
    }

    /// Create the underlying semaphore
    ///
    /// # Returns
    /// `Err(Busy)` if the mutex is already initialized
    pub fn init(&self) -> OsResult<()> {
        if is_isr_context() {
            return Err(OsError::CreateIsr);
        }

        let sem = self.kernel.semaphore_create()?;
        sem.give();
        let sem = Arc::new(sem);

        critical_section(|cs| {
            let mut state = self.state.get(cs);
            if state.sem.is_some() {
                return Err(OsError::Busy);
            }
            state.sem = Some(sem);
            state.owner = None;
            Ok(())
        })
    }

    fn semaphore(&self) -> OsResult<Arc<K::Semaphore>> {
        if let Some(sem) = self.state.lock(|s| s.sem.clone()) {
            return Ok(sem);
        }
        match self.init() {
            // Another task initialized it in between
            Ok(()) | Err(OsError::Busy) => {}
            Err(e) => return Err(e),
        }
        self.state.lock(|s| s.sem.clone()).ok_or(OsError::Invalid)
    }

    pub(crate) fn acquire(&self, timeout: OsTick) -> OsResult<()> {
        if timeout != NO_WAIT && is_isr_context() {
            return Err(OsError::PendIsr);
        }

        let sem = self.semaphore()?;
        if !sem.take(timeout) {
            return Err(if timeout == NO_WAIT { OsError::Busy } else { OsError::Timeout });
        }

        let me = self.kernel.current_task();
        self.state.lock(|s| s.owner = Some(me));
        Ok(())
    }

    /// Block until the mutex is acquired
    pub fn lock(&self) -> OsResult<()> {
        self.acquire(WAIT_FOREVER)
    }

    /// Acquire the mutex without blocking
    ///
    /// # Returns
    /// `Err(Busy)` if the mutex is held
    pub fn try_lock(&self) -> OsResult<()> {
        self.acquire(NO_WAIT)
    }

    /// Wait up to `timeout` ticks for the mutex
    pub fn lock_timeout(&self, timeout: OsTick) -> OsResult<()> {
        self.acquire(timeout)
    }

    pub(crate) fn release(&self) -> OsResult<()> {
        let sem = critical_section(|cs| {
            let mut state = self.state.get(cs);
            state.owner = None;
            state.sem.clone()
        });
        sem.ok_or(OsError::Invalid)?.give();
        Ok(())
    }

    /// Release the mutex
    pub fn unlock(&self) -> OsResult<()> {
        let me = self.kernel.current_task();
        if let Some(owner) = self.owner() {
            if owner != me {
                crate::warn!("mutex unlocked by task {} while owned by task {}", me.0, owner.0);
            }
        }
        self.release()
    }

    /// Return the mutex to the uninitialized state
    ///
    /// # Returns
    /// `Err(Busy)` while the mutex is held or used by a condition wait,
    /// `Err(Invalid)` if it was never initialized
    pub fn destroy(&self) -> OsResult<()> {
        let sem = critical_section(|cs| {
            let mut state = self.state.get(cs);
            let sem = state.sem.clone().ok_or(OsError::Invalid)?;
            if state.owner.is_some() || state.cond_refs > 0 {
                return Err(OsError::Busy);
            }
            state.sem = None;
            Ok(sem)
        })?;

        // Taking the token makes sure no lock slipped in unrecorded
        if !sem.take(NO_WAIT) {
            self.state.lock(|s| s.sem = Some(sem));
            return Err(OsError::Busy);
        }
        Ok(())
    }

    /// Task that currently holds the mutex
    pub fn owner(&self) -> Option<TaskId> {
        self.state.lock(|s| s.owner)
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.owner().is_some()
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.lock(|s| s.sem.is_some())
    }

    pub(crate) fn cond_attach(&self) {
        self.state.lock(|s| s.cond_refs += 1);
    }

    pub(crate) fn cond_detach(&self) {
        self.state.lock(|s| s.cond_refs = s.cond_refs.saturating_sub(1));
    }
}
