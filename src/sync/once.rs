//! One-time initialization guard

use alloc::sync::Arc;

use portable_atomic::{AtomicBool, Ordering};

use crate::error::{OsError, OsResult};
use crate::port::Kernel;
use crate::sync::mutex::Mutex;

/// Runs an initializer exactly once
///
/// The caller that wins the try-lock on the guard's internal mutex runs the
/// initializer. Everyone else waits on the mutex until it has finished.
pub struct Once<K: Kernel> {
    guard: Mutex<K>,
    done: AtomicBool,
}

impl<K: Kernel> Once<K> {
    pub fn new(kernel: Arc<K>) -> Self {
        Once {
            guard: Mutex::new(kernel),
            done: AtomicBool::new(false),
        }
    }

    /// Run `init` unless some caller already has
    pub fn call_once<F: FnOnce()>(&self, init: F) -> OsResult<()> {
        if self.done.load(Ordering::Acquire) {
            return Ok(());
        }

        match self.guard.try_lock() {
            Ok(()) => {
                if !self.done.load(Ordering::Acquire) {
                    init();
                    self.done.store(true, Ordering::Release);
                }
                self.guard.unlock()
            }
            Err(OsError::Busy) => {
                self.guard.lock()?;
                self.guard.unlock()
            }
            Err(e) => Err(e),
        }
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}
