//! Core type definitions
//!
//! These types provide strong typing for runtime primitives.

/// Thread priority (higher value = more urgent, kernel band `1..CFG_PRIO_MAX`)
pub type OsPrio = u8;

/// Tick counter type
pub type OsTick = u32;

/// Exit value of a thread
pub type OsExitVal = usize;

/// Do not block at all
pub const NO_WAIT: OsTick = 0;

/// Block until the operation completes
pub const WAIT_FOREVER: OsTick = OsTick::MAX;

/// `true` if `now` is at or past `deadline`, tolerating tick wraparound
#[inline]
pub fn tick_reached(now: OsTick, deadline: OsTick) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

/// `true` if `a` is strictly later than `b`, tolerating tick wraparound
#[inline]
pub fn tick_after(a: OsTick, b: OsTick) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}

/// Kernel task identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(pub u32);

/// Thread handle; identifiers are never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThreadId(pub u32);

/// Thread-specific storage key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyId(pub u32);

/// State a thread starts in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum InitialState {
    /// Runs as soon as it is created
    Run = 0,
    /// Waits for `thread_resume`
    Suspended = 1,
}

/// Whether a thread's exit value is kept for `join`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DetachState {
    Joinable = 0,
    Detached = 1,
}

/// Cancellation state; recorded but never acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CancelState {
    Enable = 0,
    Disable = 1,
}

/// Kind of physical resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ResourceType {
    Gpio = 0,
    Timer = 1,
}

impl ResourceType {
    pub const fn name(self) -> &'static str {
        match self {
            ResourceType::Gpio => "pin",
            ResourceType::Timer => "timer",
        }
    }
}

/// Subsystem that owns a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Subsystem {
    System,
    Gpio,
    Timer,
    Pwm,
    Uart,
    Spi,
    I2c,
    Stepper,
    Lora,
    Can,
    Adc,
    Servo,
    JobLoop,
    /// Application-defined owner
    User(u8),
}

impl Subsystem {
    pub const fn name(self) -> &'static str {
        match self {
            Subsystem::System => "system",
            Subsystem::Gpio => "gpio",
            Subsystem::Timer => "timer",
            Subsystem::Pwm => "pwm",
            Subsystem::Uart => "uart",
            Subsystem::Spi => "spi",
            Subsystem::I2c => "i2c",
            Subsystem::Stepper => "stepper",
            Subsystem::Lora => "lora",
            Subsystem::Can => "can",
            Subsystem::Adc => "adc",
            Subsystem::Servo => "servo",
            Subsystem::JobLoop => "jobs",
            Subsystem::User(_) => "user",
        }
    }
}
