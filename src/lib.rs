//! POSIX-style threading and resource arbitration for a minimal RTOS kernel
//!
//! Built only from the primitives a small preemptive kernel exposes
//! (tasks, binary semaphores, critical sections, a tick counter):
//! - Threads with attributes, join/detach, cleanup handlers and
//!   thread-specific keys
//! - Mutexes, condition variables and once guards
//! - A hardware resource lock manager for GPIO pins and timers
//! - A deadline-ordered job scheduler driven by one loop thread

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// ============ Critical Section ============

#[cfg(all(target_arch = "arm", not(feature = "std")))]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;

pub mod core;
pub mod port;
pub mod sync;

// ============ Re-exports ============

pub use crate::core::config;
pub use crate::core::config::*;
pub use crate::core::critical;
pub use crate::core::error;
pub use crate::core::error::{OsError, OsResult, ResourceConflict};
pub use crate::core::runtime::Runtime;
pub use crate::core::thread;
pub use crate::core::thread::attr::ThreadAttr;
pub use crate::core::types;
pub use crate::core::types::*;

#[cfg(feature = "job")]
pub use crate::core::job;
#[cfg(feature = "job")]
pub use crate::core::job::{Job, JobScheduler, JobState};
#[cfg(feature = "resource")]
pub use crate::core::resource;
#[cfg(feature = "resource")]
pub use crate::core::resource::{resource_granted, ResourceLock, ResourceManager};

pub use sync::cond::Cond;
pub use sync::mutex::Mutex;
pub use sync::once::Once;

#[cfg(feature = "std")]
pub use port::{HostKernel, HostSemaphore};
