//! Critical section handling
//!
//! All shared tables are mutated under the global, nestable critical section
//! provided by the `critical-section` crate. On Cortex-M the crate root
//! registers a PRIMASK based implementation; hosted builds use the std one.

pub use ::critical_section::CriticalSection;

/// Execute a closure inside the critical section
///
/// The closure receives the critical section token, which can be used to
/// access [`CsCell`](crate::core::cs_cell::CsCell) protected data.
/// Must not block.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    ::critical_section::with(f)
}

/// Check if currently executing in an ISR context
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(all(target_arch = "arm", target_os = "none"))]
    {
        use cortex_m::peripheral::scb::VectActive;
        cortex_m::peripheral::SCB::vect_active() != VectActive::ThreadMode
    }

    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    {
        false
    }
}
