//! Thread attributes
//!
//! Validated on every setter; copied into the kernel task parameters when
//! the thread is created.

use crate::config::{
    RuntimeConfig, CFG_NUM_CORES, CFG_PRIO_DEFAULT, CFG_PRIO_MAX, CFG_PRIO_MIN, CFG_STK_SIZE_DEFAULT,
    CFG_STK_SIZE_MIN,
};
use crate::error::{OsError, OsResult};
use crate::port::TaskParams;
use crate::types::{DetachState, InitialState, OsPrio};

/// Routine run inside a new thread before its creator returns
pub type InitFn = fn();

/// Attributes of a thread
#[derive(Debug, Clone, Copy)]
pub struct ThreadAttr {
    name: &'static str,
    stack_size: usize,
    priority: OsPrio,
    affinity: Option<u8>,
    initial_state: InitialState,
    detach_state: DetachState,
    init_fn: Option<InitFn>,
}

impl ThreadAttr {
    /// Default attributes: default stack and priority, no pinning,
    /// joinable, running
    pub const fn new() -> Self {
        ThreadAttr {
            name: "pthread",
            stack_size: if CFG_STK_SIZE_DEFAULT > CFG_STK_SIZE_MIN {
                CFG_STK_SIZE_DEFAULT
            } else {
                CFG_STK_SIZE_MIN
            },
            priority: CFG_PRIO_DEFAULT,
            affinity: None,
            initial_state: InitialState::Run,
            detach_state: DetachState::Joinable,
            init_fn: None,
        }
    }

    /// Defaults taken from a runtime configuration
    ///
    /// The configured values are not validated here; the kernel rejects
    /// them at creation time.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        ThreadAttr {
            stack_size: config.default_stack_size,
            priority: config.default_priority,
            ..Self::new()
        }
    }

    // ============ Setters ============

    pub fn set_name(&mut self, name: &'static str) -> &mut Self {
        self.name = name;
        self
    }

    /// # Returns
    /// `Err(Invalid)` if `size` is below `CFG_STK_SIZE_MIN`
    pub fn set_stack_size(&mut self, size: usize) -> OsResult<&mut Self> {
        if size < CFG_STK_SIZE_MIN {
            return Err(OsError::Invalid);
        }
        self.stack_size = size;
        Ok(self)
    }

    /// # Returns
    /// `Err(Invalid)` unless `CFG_PRIO_MIN <= prio < CFG_PRIO_MAX`
    pub fn set_priority(&mut self, prio: OsPrio) -> OsResult<&mut Self> {
        if !(CFG_PRIO_MIN..CFG_PRIO_MAX).contains(&prio) {
            return Err(OsError::Invalid);
        }
        self.priority = prio;
        Ok(self)
    }

    /// Pin the thread to `core`
    ///
    /// # Returns
    /// `Err(Invalid)` if `core >= CFG_NUM_CORES`
    pub fn set_affinity(&mut self, core: u8) -> OsResult<&mut Self> {
        if core >= CFG_NUM_CORES {
            return Err(OsError::Invalid);
        }
        self.affinity = Some(core);
        Ok(self)
    }

    pub fn clear_affinity(&mut self) -> &mut Self {
        self.affinity = None;
        self
    }

    pub fn set_initial_state(&mut self, state: InitialState) -> &mut Self {
        self.initial_state = state;
        self
    }

    pub fn set_detach_state(&mut self, state: DetachState) -> &mut Self {
        self.detach_state = state;
        self
    }

    pub fn set_init_fn(&mut self, init: Option<InitFn>) -> &mut Self {
        self.init_fn = init;
        self
    }

    // ============ Getters ============

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    #[inline]
    pub fn priority(&self) -> OsPrio {
        self.priority
    }

    #[inline]
    pub fn affinity(&self) -> Option<u8> {
        self.affinity
    }

    #[inline]
    pub fn initial_state(&self) -> InitialState {
        self.initial_state
    }

    #[inline]
    pub fn detach_state(&self) -> DetachState {
        self.detach_state
    }

    #[inline]
    pub fn init_fn(&self) -> Option<InitFn> {
        self.init_fn
    }

    pub(crate) fn task_params(&self) -> TaskParams {
        TaskParams {
            name: self.name,
            stack_size: self.stack_size,
            priority: self.priority,
            affinity: self.affinity,
        }
    }
}

impl Default for ThreadAttr {
    fn default() -> Self {
        Self::new()
    }
}
