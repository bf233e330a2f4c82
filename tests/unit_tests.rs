//! Unit tests for the runtime modules
//!
//! These tests run on the host using the hosted kernel port and exercise
//! the single-threaded behaviour of each module.

#[cfg(test)]
mod config_tests {
    use rtposix::config::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RuntimeConfig::default();
        assert!(config.is_valid());
        assert_eq!(config.default_stack_size, CFG_STK_SIZE_DEFAULT);
        assert_eq!(config.default_priority, CFG_PRIO_DEFAULT);
        assert_eq!(config.gpio_units, CFG_GPIO_UNITS);
        assert_eq!(config.timer_units, CFG_TIMER_UNITS);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = RuntimeConfig::default();
        config.default_stack_size = CFG_STK_SIZE_MIN - 1;
        assert!(!config.is_valid());

        let mut config = RuntimeConfig::default();
        config.default_priority = CFG_PRIO_MAX;
        assert!(!config.is_valid());
    }

    #[test]
    fn test_ms_to_ticks() {
        assert_eq!(ms_to_ticks(0), 0);
        assert_eq!(ms_to_ticks(1000), CFG_TICK_RATE_HZ);
        assert_eq!(ms_to_ticks(10), 10 * CFG_TICK_RATE_HZ / 1000);
    }
}

#[cfg(test)]
mod types_tests {
    use rtposix::types::*;

    #[test]
    fn test_tick_reached() {
        assert!(tick_reached(100, 100));
        assert!(tick_reached(101, 100));
        assert!(!tick_reached(99, 100));
    }

    #[test]
    fn test_tick_wraparound() {
        // Deadline just past the wrap point
        let deadline = 5u32;
        assert!(!tick_reached(u32::MAX - 5, deadline));
        assert!(tick_reached(6, deadline));

        assert!(tick_after(5, u32::MAX - 5));
        assert!(!tick_after(u32::MAX - 5, 5));
        assert!(!tick_after(7, 7));
    }

    #[test]
    fn test_names() {
        assert_eq!(ResourceType::Gpio.name(), "pin");
        assert_eq!(ResourceType::Timer.name(), "timer");
        assert_eq!(Subsystem::Spi.name(), "spi");
        assert_eq!(Subsystem::System.name(), "system");
    }
}

#[cfg(test)]
mod error_tests {
    use rtposix::error::errno;
    use rtposix::{OsError, ResourceConflict, ResourceType, Subsystem};

    #[test]
    fn test_errno_mapping() {
        assert_eq!(OsError::Invalid.errno(), errno::EINVAL);
        assert_eq!(OsError::InvalidState.errno(), errno::EINVAL);
        assert_eq!(OsError::Busy.errno(), errno::EBUSY);
        assert_eq!(OsError::Timeout.errno(), errno::ETIMEDOUT);
        assert_eq!(OsError::NotFound.errno(), errno::ESRCH);
    }

    #[test]
    fn test_codes_are_distinct() {
        let all = [
            OsError::Invalid,
            OsError::Busy,
            OsError::ResourceConflict,
            OsError::Timeout,
            OsError::NotFound,
            OsError::InvalidState,
            OsError::StkSizeInvalid,
            OsError::PrioInvalid,
            OsError::AffinityInvalid,
            OsError::TaskCreate,
            OsError::SemCreate,
            OsError::PendIsr,
            OsError::CreateIsr,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }

    #[test]
    fn test_conflict_message() {
        let conflict = ResourceConflict {
            resource_type: ResourceType::Gpio,
            unit: 5,
            owner: Subsystem::Spi,
            owner_unit: 0,
        };
        assert_eq!(conflict.to_string(), "pin 5 is used by spi0");
        assert_eq!(OsError::from(conflict), OsError::ResourceConflict);
    }

    #[test]
    fn test_conflict_message_names_user_owner() {
        let conflict = ResourceConflict {
            resource_type: ResourceType::Timer,
            unit: 3,
            owner: Subsystem::User(7),
            owner_unit: 1,
        };
        assert_eq!(conflict.to_string(), "timer 3 is used by user7.1");
    }
}

#[cfg(test)]
mod attr_tests {
    use rtposix::config::*;
    use rtposix::{DetachState, InitialState, OsError, ThreadAttr};

    #[test]
    fn test_defaults() {
        let attr = ThreadAttr::new();
        assert!(attr.stack_size() >= CFG_STK_SIZE_MIN);
        assert_eq!(attr.priority(), CFG_PRIO_DEFAULT);
        assert_eq!(attr.affinity(), None);
        assert_eq!(attr.initial_state(), InitialState::Run);
        assert_eq!(attr.detach_state(), DetachState::Joinable);
        assert!(attr.init_fn().is_none());
    }

    #[test]
    fn test_stack_size_bounds() {
        let mut attr = ThreadAttr::new();
        assert_eq!(attr.set_stack_size(CFG_STK_SIZE_MIN - 1).err(), Some(OsError::Invalid));
        assert!(attr.set_stack_size(CFG_STK_SIZE_MIN).is_ok());
        assert_eq!(attr.stack_size(), CFG_STK_SIZE_MIN);
    }

    #[test]
    fn test_priority_bounds() {
        let mut attr = ThreadAttr::new();
        assert_eq!(attr.set_priority(0).err(), Some(OsError::Invalid));
        assert_eq!(attr.set_priority(CFG_PRIO_MAX).err(), Some(OsError::Invalid));
        assert!(attr.set_priority(CFG_PRIO_MIN).is_ok());
        assert!(attr.set_priority(CFG_PRIO_MAX - 1).is_ok());
        assert_eq!(attr.priority(), CFG_PRIO_MAX - 1);
    }

    #[test]
    fn test_affinity_bounds() {
        let mut attr = ThreadAttr::new();
        assert_eq!(attr.set_affinity(CFG_NUM_CORES).err(), Some(OsError::Invalid));
        assert!(attr.set_affinity(CFG_NUM_CORES - 1).is_ok());
        assert_eq!(attr.affinity(), Some(CFG_NUM_CORES - 1));
        attr.clear_affinity();
        assert_eq!(attr.affinity(), None);
    }

    #[test]
    fn test_failed_setter_keeps_value() {
        let mut attr = ThreadAttr::new();
        attr.set_priority(3).unwrap();
        let _ = attr.set_priority(200);
        assert_eq!(attr.priority(), 3);
    }
}

#[cfg(test)]
mod mutex_tests {
    use rtposix::{HostKernel, OsError, Runtime};

    #[test]
    fn test_lazy_init() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let m = rt.mutex();
        assert!(!m.is_initialized());
        m.lock().unwrap();
        assert!(m.is_initialized());
        assert!(m.is_locked());
        m.unlock().unwrap();
        assert!(!m.is_locked());
    }

    #[test]
    fn test_init_twice_is_busy() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let m = rt.mutex();
        m.init().unwrap();
        assert_eq!(m.init(), Err(OsError::Busy));
    }

    #[test]
    fn test_trylock() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let m = rt.mutex();
        m.try_lock().unwrap();
        // Not recursive
        assert_eq!(m.try_lock(), Err(OsError::Busy));
        m.unlock().unwrap();
        m.try_lock().unwrap();
        m.unlock().unwrap();
    }

    #[test]
    fn test_lock_timeout() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let m = rt.mutex();
        m.lock().unwrap();
        assert_eq!(m.lock_timeout(5), Err(OsError::Timeout));
        m.unlock().unwrap();
    }

    #[test]
    fn test_destroy() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let m = rt.mutex();
        assert_eq!(m.destroy(), Err(OsError::Invalid));

        m.lock().unwrap();
        assert_eq!(m.destroy(), Err(OsError::Busy));
        m.unlock().unwrap();

        m.destroy().unwrap();
        assert!(!m.is_initialized());
        m.init().unwrap();
    }
}

#[cfg(test)]
mod port_tests {
    use std::sync::Arc;

    use rtposix::port::{Kernel, TaskEntry, TaskParams};
    use rtposix::{HostKernel, HostSemaphore, Mutex, OsError, OsResult, OsTick, Runtime, TaskId};

    /// Host kernel that has run out of semaphores
    #[derive(Default)]
    struct ExhaustedKernel(HostKernel);

    impl Kernel for ExhaustedKernel {
        type Semaphore = HostSemaphore;

        fn semaphore_create(&self) -> OsResult<HostSemaphore> {
            Err(OsError::SemCreate)
        }

        fn task_create(&self, params: &TaskParams, entry: TaskEntry) -> OsResult<TaskId> {
            self.0.task_create(params, entry)
        }

        fn current_task(&self) -> TaskId {
            self.0.current_task()
        }

        fn tick_count(&self) -> OsTick {
            self.0.tick_count()
        }

        fn defer_to_thread(&self, f: TaskEntry) -> OsResult<()> {
            self.0.defer_to_thread(f)
        }
    }

    #[test]
    fn test_semaphore_exhaustion_reaches_caller() {
        let m = Mutex::new(Arc::new(ExhaustedKernel::default()));
        assert_eq!(m.init(), Err(OsError::SemCreate));
        assert_eq!(m.lock(), Err(OsError::SemCreate));
        assert!(!m.is_initialized());

        assert_eq!(Runtime::new(ExhaustedKernel::default()).err(), Some(OsError::SemCreate));
    }
}

#[cfg(test)]
mod cond_tests {
    use rtposix::{HostKernel, OsError, Runtime};

    #[test]
    fn test_uninitialized() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let c = rt.cond();
        let m = rt.mutex();
        m.lock().unwrap();
        assert_eq!(c.signal(), Err(OsError::Invalid));
        assert_eq!(c.wait(&m), Err(OsError::Invalid));
        assert_eq!(c.destroy(), Err(OsError::Invalid));
        // The caller still holds its mutex
        assert!(m.is_locked());
    }

    #[test]
    fn test_signal_without_waiter() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let c = rt.cond();
        c.init().unwrap();
        c.signal().unwrap();
        c.signal().unwrap();
        assert_eq!(c.waiters(), 0);
    }

    #[test]
    fn test_timed_wait_relocks() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let c = rt.cond();
        let m = rt.mutex();
        c.init().unwrap();
        m.lock().unwrap();

        assert_eq!(c.timed_wait(&m, 10), Err(OsError::Timeout));
        assert!(m.is_locked());
        assert_eq!(c.waiters(), 0);

        m.unlock().unwrap();
        c.destroy().unwrap();
    }

    #[test]
    fn test_reinit_idle() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let c = rt.cond();
        c.init().unwrap();
        c.init().unwrap();
        c.destroy().unwrap();
        assert!(!c.is_initialized());
    }
}

#[cfg(test)]
mod key_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rtposix::{HostKernel, OsError, Runtime};

    static DESTROYED: AtomicUsize = AtomicUsize::new(0);

    fn destructor(value: usize) {
        DESTROYED.fetch_add(value, Ordering::SeqCst);
    }

    #[test]
    fn test_set_get() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let key = rt.key_create(None);
        assert_eq!(rt.get_specific(key), None);

        rt.set_specific(key, 42).unwrap();
        assert_eq!(rt.get_specific(key), Some(42));

        rt.set_specific(key, 7).unwrap();
        assert_eq!(rt.get_specific(key), Some(7));

        // Zero removes the value
        rt.set_specific(key, 0).unwrap();
        assert_eq!(rt.get_specific(key), None);
    }

    #[test]
    fn test_delete() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let key = rt.key_create(None);
        rt.set_specific(key, 1).unwrap();
        rt.key_delete(key).unwrap();

        assert_eq!(rt.get_specific(key), None);
        assert_eq!(rt.set_specific(key, 1), Err(OsError::NotFound));
        assert_eq!(rt.key_delete(key), Err(OsError::NotFound));
    }

    static DELETED: AtomicUsize = AtomicUsize::new(0);

    fn delete_destructor(value: usize) {
        DELETED.fetch_add(value, Ordering::SeqCst);
    }

    #[test]
    fn test_delete_skips_destructor() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let key = rt.key_create(Some(delete_destructor));
        rt.set_specific(key, 9).unwrap();

        rt.key_delete(key).unwrap();
        assert_eq!(DELETED.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_values_are_per_thread() {
        let rt = Runtime::new(HostKernel::new()).unwrap();
        let key = rt.key_create(Some(destructor));
        rt.set_specific(key, 1).unwrap();

        let child = rt.clone();
        let t = rt
            .thread_create(None, move || {
                let before = child.get_specific(key);
                child.set_specific(key, 100).unwrap();
                before.unwrap_or(0)
            })
            .unwrap();

        assert_eq!(rt.thread_join(t).unwrap(), 0);
        assert_eq!(rt.get_specific(key), Some(1));
        // The child's value went through the destructor on exit
        assert_eq!(DESTROYED.load(Ordering::SeqCst), 100);
    }
}

#[cfg(test)]
mod resource_tests {
    use rtposix::{resource_granted, OsError, ResourceManager, ResourceType, Subsystem};

    fn manager() -> ResourceManager {
        ResourceManager::new(64, 9)
    }

    #[test]
    fn test_grant_and_conflict() {
        let res = manager();

        let a = res.lock(ResourceType::Gpio, Some(5), Subsystem::Spi, 0).unwrap();
        assert!(resource_granted(&a));

        let b = res.lock(ResourceType::Gpio, Some(5), Subsystem::I2c, 1).unwrap();
        assert!(!resource_granted(&b));
        assert_eq!(b.owner, Subsystem::Spi);
        assert_eq!(b.owner_unit, 0);

        let conflict = b.into_result().unwrap_err();
        assert_eq!(conflict.to_string(), "pin 5 is used by spi0");

        res.unlock(ResourceType::Gpio, 5).unwrap();
        let b = res.lock(ResourceType::Gpio, Some(5), Subsystem::I2c, 1).unwrap();
        assert!(b.granted());
    }

    #[test]
    fn test_same_owner_relock() {
        let res = manager();
        assert!(res.lock(ResourceType::Gpio, Some(3), Subsystem::Uart, 2).unwrap().granted);
        assert!(res.lock(ResourceType::Gpio, Some(3), Subsystem::Uart, 2).unwrap().granted);
        // Same subsystem, different unit
        assert!(!res.lock(ResourceType::Gpio, Some(3), Subsystem::Uart, 1).unwrap().granted);
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let res = manager();
        res.unlock(ResourceType::Gpio, 10).unwrap();
        res.unlock(ResourceType::Gpio, 10).unwrap();
        assert_eq!(res.owner(ResourceType::Gpio, 10), Ok(None));
    }

    #[test]
    fn test_out_of_range() {
        let res = manager();
        assert_eq!(
            res.lock(ResourceType::Gpio, Some(64), Subsystem::Pwm, 0).err(),
            Some(OsError::NotFound)
        );
        assert_eq!(res.unlock(ResourceType::Timer, 9), Err(OsError::NotFound));
        assert_eq!(res.owner(ResourceType::Timer, 100), Err(OsError::NotFound));
    }

    #[test]
    fn test_timer_zero_reserved() {
        let res = manager();
        assert_eq!(res.owner(ResourceType::Timer, 0), Ok(Some((Subsystem::System, 0))));

        let lock = res.lock(ResourceType::Timer, Some(0), Subsystem::Pwm, 0).unwrap();
        assert!(!lock.granted);
        assert_eq!(lock.owner, Subsystem::System);
    }

    #[test]
    fn test_any_unit() {
        let res = ResourceManager::new(4, 3);

        let t = res.lock(ResourceType::Timer, None, Subsystem::Pwm, 0).unwrap();
        assert!(t.granted);
        assert_eq!(t.unit, 1);
        let t = res.lock(ResourceType::Timer, None, Subsystem::Pwm, 1).unwrap();
        assert_eq!(t.unit, 2);
        assert_eq!(
            res.lock(ResourceType::Timer, None, Subsystem::Pwm, 2).err(),
            Some(OsError::NotFound)
        );

        res.unlock(ResourceType::Timer, 1).unwrap();
        let t = res.lock(ResourceType::Timer, None, Subsystem::Stepper, 0).unwrap();
        assert_eq!(t.unit, 1);
    }

    #[test]
    fn test_unlock_all() {
        let res = manager();
        for pin in [2, 4, 6] {
            assert!(res.lock(ResourceType::Gpio, Some(pin), Subsystem::Spi, 1).unwrap().granted);
        }
        assert!(res.lock(ResourceType::Gpio, Some(8), Subsystem::Spi, 0).unwrap().granted);
        assert!(res.lock(ResourceType::Timer, Some(3), Subsystem::Spi, 1).unwrap().granted);

        assert_eq!(res.unlock_all(Subsystem::Spi, 1), 4);
        assert_eq!(res.owner(ResourceType::Gpio, 4), Ok(None));
        assert_eq!(res.owner(ResourceType::Gpio, 8), Ok(Some((Subsystem::Spi, 0))));
        assert_eq!(res.unlock_all(Subsystem::Spi, 1), 0);
    }
}

#[cfg(test)]
mod job_tests {
    use std::sync::{Arc, Mutex};

    use rtposix::{HostKernel, Job, JobState, OsError, Runtime};

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn Fn(Job) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = log.clone();
        let make = move |name: &'static str| -> Box<dyn Fn(Job) + Send + Sync> {
            let log = log2.clone();
            Box::new(move |_| log.lock().unwrap().push(name))
        };
        (log, make)
    }

    fn drain(rt: &Runtime<HostKernel>) {
        while rt.jobs().run_once() {}
    }

    #[test]
    fn test_deadline_order() {
        let rt = Runtime::new(HostKernel::with_manual_ticks()).unwrap();
        let jobs = rt.jobs();
        let (log, make) = recorder();

        let j1 = jobs.job();
        let j2 = jobs.job();
        let j3 = jobs.job();
        jobs.set_timed(j1, 100, make("j1")).unwrap();
        jobs.set_timed(j2, 50, make("j2")).unwrap();
        jobs.set_immediate(j3, make("j3")).unwrap();

        drain(&rt);
        assert_eq!(*log.lock().unwrap(), ["j3"]);

        rt.kernel().set_ticks(60);
        drain(&rt);
        assert_eq!(*log.lock().unwrap(), ["j3", "j2"]);

        rt.kernel().set_ticks(101);
        drain(&rt);
        assert_eq!(*log.lock().unwrap(), ["j3", "j2", "j1"]);
    }

    #[test]
    fn test_equal_deadlines_fifo() {
        let rt = Runtime::new(HostKernel::with_manual_ticks()).unwrap();
        let jobs = rt.jobs();
        let (log, make) = recorder();

        for name in ["a", "b", "c"] {
            let job = jobs.job();
            jobs.set_timed(job, 20, make(name)).unwrap();
        }
        let early = jobs.job();
        jobs.set_timed(early, 10, make("early")).unwrap();

        rt.kernel().set_ticks(20);
        drain(&rt);
        assert_eq!(*log.lock().unwrap(), ["early", "a", "b", "c"]);
    }

    #[test]
    fn test_runnable_before_due() {
        let rt = Runtime::new(HostKernel::with_manual_ticks()).unwrap();
        let jobs = rt.jobs();
        let (log, make) = recorder();

        let timed = jobs.job();
        jobs.set_timed(timed, 0, make("timed")).unwrap();
        let now1 = jobs.job();
        let now2 = jobs.job();
        jobs.set_immediate(now1, make("now1")).unwrap();
        jobs.set_immediate(now2, make("now2")).unwrap();

        drain(&rt);
        assert_eq!(*log.lock().unwrap(), ["now1", "now2", "timed"]);
    }

    #[test]
    fn test_wraparound_deadline() {
        let rt = Runtime::new(HostKernel::with_manual_ticks()).unwrap();
        let jobs = rt.jobs();
        let (log, make) = recorder();
        rt.kernel().set_ticks(u32::MAX - 10);

        let after_wrap = jobs.job();
        let before_wrap = jobs.job();
        jobs.set_timed(after_wrap, 5, make("after")).unwrap();
        jobs.set_timed(before_wrap, u32::MAX - 5, make("before")).unwrap();

        drain(&rt);
        assert!(log.lock().unwrap().is_empty());

        rt.kernel().advance(20);
        drain(&rt);
        assert_eq!(*log.lock().unwrap(), ["before", "after"]);
    }

    #[test]
    fn test_reschedule_moves_job() {
        let rt = Runtime::new(HostKernel::with_manual_ticks()).unwrap();
        let jobs = rt.jobs();
        let (log, make) = recorder();

        let job = jobs.job();
        jobs.set_timed(job, 100, make("timed")).unwrap();
        assert_eq!(jobs.state(job), Ok(JobState::Scheduled(100)));

        jobs.set_immediate(job, make("immediate")).unwrap();
        assert_eq!(jobs.state(job), Ok(JobState::Runnable));

        rt.kernel().set_ticks(200);
        drain(&rt);
        // Only once: the job left the scheduled queue
        assert_eq!(*log.lock().unwrap(), ["immediate"]);
        assert_eq!(jobs.state(job), Ok(JobState::Idle));
    }

    #[test]
    fn test_clear() {
        let rt = Runtime::new(HostKernel::with_manual_ticks()).unwrap();
        let jobs = rt.jobs();
        let (log, make) = recorder();

        let job = jobs.job();
        // Clearing an idle job is a no-op
        jobs.clear(job).unwrap();
        jobs.clear(job).unwrap();

        jobs.set_immediate(job, make("x")).unwrap();
        assert!(jobs.is_pending(job));
        jobs.clear(job).unwrap();
        assert!(!jobs.is_pending(job));

        drain(&rt);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_release_makes_handle_stale() {
        let rt = Runtime::new(HostKernel::with_manual_ticks()).unwrap();
        let jobs = rt.jobs();
        let (_log, make) = recorder();

        let job = jobs.job();
        jobs.set_timed(job, 10, make("x")).unwrap();
        jobs.release(job).unwrap();

        assert_eq!(jobs.clear(job), Err(OsError::NotFound));
        assert_eq!(jobs.set_immediate(job, make("y")), Err(OsError::NotFound));

        // The slot is reused under a new handle
        let again = jobs.job();
        assert_ne!(again, job);
        assert_eq!(jobs.state(again), Ok(JobState::Idle));
    }

    #[test]
    fn test_callback_can_reschedule() {
        let rt = Runtime::new(HostKernel::with_manual_ticks()).unwrap();
        let (log, make) = recorder();
        let job = rt.jobs().job();

        let rt2 = rt.clone();
        let first = make("first");
        rt.jobs()
            .set_immediate(job, move |j| {
                first(j);
                rt2.jobs().set_timed(j, 5, |_| ()).unwrap();
            })
            .unwrap();

        drain(&rt);
        assert_eq!(*log.lock().unwrap(), ["first"]);
        assert_eq!(rt.jobs().state(job), Ok(JobState::Scheduled(5)));
    }
}
