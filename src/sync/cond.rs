//! Condition variable
//!
//! Built from an internal [`Mutex`] and a count of blocked waiters. The
//! first waiter arms the internal mutex with an extra lock, after which
//! every waiter blocks trying to acquire it. [`Cond::signal`] releases it
//! once per signal. Wake tokens that arrive while an earlier one is still
//! being consumed are counted in `pending` and handed on by the waiter that
//! wakes, so N signals always wake N waiters.

use alloc::sync::Arc;

use crate::core::cs_cell::CsCell;
use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::port::Kernel;
use crate::sync::mutex::Mutex;
use crate::types::{OsTick, WAIT_FOREVER};

struct CondState<K: Kernel> {
    internal: Option<Arc<Mutex<K>>>,
    /// Waiters blocked and not yet signaled
    referenced: u32,
    /// Signals not yet consumed by a waiter
    pending: u32,
    /// Internal mutex holds the extra lock
    armed: bool,
}

/// Condition variable
pub struct Cond<K: Kernel> {
    kernel: Arc<K>,
    state: CsCell<CondState<K>>,
}

impl<K: Kernel> Cond<K> {
    /// Create an uninitialized condition variable
    pub fn new(kernel: Arc<K>) -> Self {
        Cond {
            kernel,
            state: CsCell::new(CondState {
                internal: None,
                referenced: 0,
                pending: 0,
                armed: false,
            }),
        }
    }

    /// Create the internal mutex
    ///
    /// # Returns
    /// `Err(Busy)` while waiters are registered
    pub fn init(&self) -> OsResult<()> {
        if is_isr_context() {
            return Err(OsError::CreateIsr);
        }

        let internal = Mutex::new(self.kernel.clone());
        internal.init()?;
        let internal = Arc::new(internal);

        critical_section(|cs| {
            let mut state = self.state.get(cs);
            if state.referenced + state.pending > 0 {
                return Err(OsError::Busy);
            }
            state.internal = Some(internal);
            state.armed = false;
            Ok(())
        })
    }

    /// Release the internal mutex
    ///
    /// # Returns
    /// `Err(Busy)` while waiters are registered, `Err(Invalid)` if never
    /// initialized
    pub fn destroy(&self) -> OsResult<()> {
        critical_section(|cs| {
            let mut state = self.state.get(cs);
            if state.internal.is_none() {
                return Err(OsError::Invalid);
            }
            if state.referenced + state.pending > 0 {
                crate::warn!("cond destroy refused, {} waiters", state.referenced + state.pending);
                return Err(OsError::Busy);
            }
            state.internal = None;
            state.armed = false;
            Ok(())
        })
    }

    /// Block until signaled
    ///
    /// `mutex` must be held by the caller. It is released while blocked and
    /// held again on return.
    pub fn wait(&self, mutex: &Mutex<K>) -> OsResult<()> {
        self.wait_ticks(mutex, WAIT_FOREVER)
    }

    /// As [`wait`](Self::wait), giving up after `timeout` ticks
    ///
    /// # Returns
    /// `Err(Timeout)` if no signal arrived in time; `mutex` is held again
    /// in every case
    pub fn timed_wait(&self, mutex: &Mutex<K>, timeout: OsTick) -> OsResult<()> {
        self.wait_ticks(mutex, timeout)
    }

    fn wait_ticks(&self, mutex: &Mutex<K>, timeout: OsTick) -> OsResult<()> {
        if is_isr_context() {
            return Err(OsError::PendIsr);
        }

        let internal = critical_section(|cs| -> OsResult<Arc<Mutex<K>>> {
            let mut state = self.state.get(cs);
            let internal = state.internal.clone().ok_or(OsError::Invalid)?;
            if !state.armed {
                internal.try_lock()?;
                state.armed = true;
            }
            state.referenced += 1;
            Ok(internal)
        })?;

        mutex.cond_attach();
        let unlocked = mutex.unlock();
        if let Err(e) = unlocked {
            self.state.lock(|s| s.referenced = s.referenced.saturating_sub(1));
            mutex.cond_detach();
            return Err(e);
        }

        let mut result = match internal.acquire(timeout) {
            Ok(()) => Ok(()),
            Err(OsError::Timeout) => {
                let withdrawn = self.state.lock(|s| {
                    if s.referenced > 0 {
                        s.referenced -= 1;
                        true
                    } else {
                        false
                    }
                });
                if withdrawn {
                    Err(OsError::Timeout)
                } else {
                    // Signaled after the timeout expired; the token is ours
                    internal.acquire(WAIT_FOREVER)
                }
            }
            Err(e) => Err(e),
        };

        if result.is_ok() {
            let pass_on = self.state.lock(|s| {
                s.pending = s.pending.saturating_sub(1);
                s.pending > 0
            });
            if pass_on {
                result = internal.release();
            }
        }

        let relocked = mutex.lock();
        mutex.cond_detach();
        relocked?;
        result
    }

    /// Wake one waiter; no effect when nobody waits
    pub fn signal(&self) -> OsResult<()> {
        let wake = critical_section(|cs| -> OsResult<Option<Arc<Mutex<K>>>> {
            let mut state = self.state.get(cs);
            let internal = state.internal.clone().ok_or(OsError::Invalid)?;
            if state.referenced == 0 {
                return Ok(None);
            }
            state.referenced -= 1;
            state.pending += 1;
            Ok(if state.pending == 1 { Some(internal) } else { None })
        })?;

        match wake {
            Some(internal) => internal.release(),
            None => Ok(()),
        }
    }

    /// Number of waiters not yet signaled
    pub fn waiters(&self) -> u32 {
        self.state.lock(|s| s.referenced)
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.lock(|s| s.internal.is_some())
    }
}
