//! Port layer - kernel primitive adapter
//!
//! The runtime is built only from what a minimal preemptive kernel offers:
//! task creation, binary semaphores, a tick counter and deferred callbacks.
//! Critical sections come from the `critical-section` crate. A port
//! implements [`Kernel`] for its kernel; [`hosted`] runs on `std` threads.

use alloc::boxed::Box;

use crate::error::OsResult;
use crate::types::{OsPrio, OsTick, TaskId};

#[cfg(feature = "std")]
pub mod hosted;

#[cfg(feature = "std")]
pub use hosted::{HostKernel, HostSemaphore};

/// Entry point handed to [`Kernel::task_create`]
pub type TaskEntry = Box<dyn FnOnce() + Send + 'static>;

/// Parameters of a kernel task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskParams {
    pub name: &'static str,
    /// Stack size in bytes
    pub stack_size: usize,
    pub priority: OsPrio,
    /// Core to pin the task to, `None` lets the kernel choose
    pub affinity: Option<u8>,
}

/// Binary semaphore provided by the kernel
///
/// Created empty. `give` on a full semaphore has no effect.
pub trait BinarySemaphore: Send + Sync + 'static {
    /// Wait up to `timeout` ticks for the semaphore
    ///
    /// # Arguments
    /// * `timeout` - [`NO_WAIT`](crate::types::NO_WAIT), a tick count, or
    ///   [`WAIT_FOREVER`](crate::types::WAIT_FOREVER)
    ///
    /// # Returns
    /// `true` if the semaphore was taken
    fn take(&self, timeout: OsTick) -> bool;

    /// Release the semaphore. Safe to call from an ISR.
    fn give(&self);
}

/// Kernel primitives consumed by the runtime
pub trait Kernel: Send + Sync + 'static {
    type Semaphore: BinarySemaphore;

    /// Create an empty binary semaphore
    ///
    /// Ports report an exhausted kernel as `Err(SemCreate)`; the error
    /// reaches the caller of the operation that needed the semaphore.
    fn semaphore_create(&self) -> OsResult<Self::Semaphore>;

    /// Spawn a task running `entry`
    ///
    /// Errors are surfaced to the caller unchanged.
    fn task_create(&self, params: &TaskParams, entry: TaskEntry) -> OsResult<TaskId>;

    /// Identity of the calling task
    fn current_task(&self) -> TaskId;

    /// Monotonic tick counter; wraps around
    fn tick_count(&self) -> OsTick;

    /// Run `f` later in task context, used from interrupt handlers
    fn defer_to_thread(&self, f: TaskEntry) -> OsResult<()>;
}
