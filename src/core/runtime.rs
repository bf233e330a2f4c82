//! Runtime context
//!
//! Owns the kernel adapter and every table the threading, resource and job
//! layers need. Instances are independent, so several can coexist (one per
//! test, for example).

use alloc::boxed::Box;
use alloc::sync::Arc;

use crate::config::RuntimeConfig;
use crate::core::cs_cell::CsCell;
use crate::core::thread::key::KeyTable;
use crate::core::thread::ThreadTable;
use crate::error::OsResult;
use crate::port::Kernel;
use crate::sync::cond::Cond;
use crate::sync::mutex::Mutex;
use crate::sync::once::Once;
use crate::types::OsTick;

#[cfg(feature = "job")]
use crate::core::job::JobScheduler;
#[cfg(feature = "resource")]
use crate::core::resource::ResourceManager;

/// Runtime context shared by every thread it creates
pub struct Runtime<K: Kernel> {
    pub(crate) kernel: Arc<K>,
    pub(crate) config: RuntimeConfig,
    pub(crate) threads: CsCell<ThreadTable<K::Semaphore>>,
    pub(crate) keys: CsCell<KeyTable>,
    #[cfg(feature = "resource")]
    resources: ResourceManager,
    #[cfg(feature = "job")]
    pub(crate) jobs: JobScheduler<K>,
}

impl<K: Kernel> Runtime<K> {
    /// Create a runtime with the compile-time defaults
    pub fn new(kernel: K) -> OsResult<Arc<Self>> {
        Self::with_config(kernel, RuntimeConfig::default())
    }

    /// Create a runtime with explicit defaults and table sizes
    pub fn with_config(kernel: K, config: RuntimeConfig) -> OsResult<Arc<Self>> {
        if !config.is_valid() {
            crate::warn!("runtime config outside kernel bounds, thread creation may fail");
        }

        let kernel = Arc::new(kernel);
        let rt = Runtime {
            #[cfg(feature = "job")]
            jobs: JobScheduler::new(kernel.clone())?,
            #[cfg(feature = "resource")]
            resources: ResourceManager::new(config.gpio_units, config.timer_units),
            kernel,
            config,
            threads: CsCell::new(ThreadTable::new()),
            keys: CsCell::new(KeyTable::new()),
        };

        crate::info!("runtime up, {} gpio, {} timers", config.gpio_units, config.timer_units);
        Ok(Arc::new(rt))
    }

    #[inline]
    pub fn kernel(&self) -> &Arc<K> {
        &self.kernel
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Current kernel tick count
    #[inline]
    pub fn now(&self) -> OsTick {
        self.kernel.tick_count()
    }

    /// New uninitialized mutex bound to this runtime's kernel
    pub fn mutex(&self) -> Mutex<K> {
        Mutex::new(self.kernel.clone())
    }

    /// New uninitialized condition variable
    pub fn cond(&self) -> Cond<K> {
        Cond::new(self.kernel.clone())
    }

    /// New once guard
    pub fn once(&self) -> Once<K> {
        Once::new(self.kernel.clone())
    }

    /// Hand `f` to the kernel to run in task context
    ///
    /// For interrupt handlers that need to do blocking work.
    pub fn defer<F>(&self, f: F) -> OsResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.kernel.defer_to_thread(Box::new(f))
    }

    #[cfg(feature = "resource")]
    #[inline]
    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    #[cfg(feature = "job")]
    #[inline]
    pub fn jobs(&self) -> &JobScheduler<K> {
        &self.jobs
    }
}
