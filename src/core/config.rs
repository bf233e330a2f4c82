//! Compile-time configuration
//!
//! These constants control the defaults and resource limits of the runtime.
//! [`RuntimeConfig`] carries the per-instance subset.

use crate::types::{OsPrio, OsTick};

/// Number of priority levels exposed by the kernel
pub const CFG_PRIO_MAX: OsPrio = 25;

/// Lowest priority a thread may be created with
pub const CFG_PRIO_MIN: OsPrio = 1;

/// Priority used when no attributes are given
pub const CFG_PRIO_DEFAULT: OsPrio = 5;

/// System tick rate in Hz
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Minimum thread stack size in bytes
pub const CFG_STK_SIZE_MIN: usize = 2048;

/// Stack size used when no attributes are given
pub const CFG_STK_SIZE_DEFAULT: usize = 8192;

/// Number of CPU cores threads may be pinned to
pub const CFG_NUM_CORES: u8 = 2;

/// Number of GPIO pins tracked by the resource manager
pub const CFG_GPIO_UNITS: u16 = 64;

/// Number of hardware timers tracked by the resource manager
pub const CFG_TIMER_UNITS: u16 = 9;

/// Stack size of the job loop thread
pub const CFG_JOB_STK_SIZE: usize = 4096;

/// Priority of the job loop thread
pub const CFG_JOB_PRIO: OsPrio = 21;

/// Core the job loop thread is pinned to
pub const CFG_JOB_CORE: u8 = 0;

/// Convert milliseconds to ticks, rounding up
#[inline]
pub const fn ms_to_ticks(ms: u32) -> OsTick {
    ((ms as u64 * CFG_TICK_RATE_HZ as u64 + 999) / 1000) as OsTick
}

/// Per-runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size given to threads created without attributes
    pub default_stack_size: usize,
    /// Priority given to threads created without attributes
    pub default_priority: OsPrio,
    /// Number of cores valid for affinity
    pub num_cores: u8,
    /// GPIO table size
    pub gpio_units: u16,
    /// Timer table size
    pub timer_units: u16,
}

impl RuntimeConfig {
    pub const fn new() -> Self {
        RuntimeConfig {
            default_stack_size: CFG_STK_SIZE_DEFAULT,
            default_priority: CFG_PRIO_DEFAULT,
            num_cores: CFG_NUM_CORES,
            gpio_units: CFG_GPIO_UNITS,
            timer_units: CFG_TIMER_UNITS,
        }
    }

    /// Check the configured defaults against the compile-time bounds
    pub fn is_valid(&self) -> bool {
        self.default_stack_size >= CFG_STK_SIZE_MIN
            && (CFG_PRIO_MIN..CFG_PRIO_MAX).contains(&self.default_priority)
            && self.num_cores > 0
            && self.timer_units > 0
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
