//! Error types
//!
//! Uses Rust's Result pattern instead of C-style error codes. Every variant
//! still maps onto a POSIX errno so a C shim can hand it back unchanged.

use core::fmt;

use crate::types::{ResourceType, Subsystem};

/// Runtime error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum OsError {
    // ============ Argument errors ============
    /// Argument outside its valid range, or object not initialized
    Invalid = 1001,

    // ============ Contention errors ============
    /// Object is held or still referenced
    Busy = 2001,
    /// Resource owned by another subsystem
    ResourceConflict = 2002,

    // ============ Timeout ============
    /// Operation timed out
    Timeout = 3001,

    // ============ Lookup errors ============
    /// No such thread, key, job or resource unit
    NotFound = 4001,

    // ============ State errors ============
    /// Operation not allowed in the object's current state
    InvalidState = 5001,

    // ============ Kernel errors ============
    /// Stack size below the platform minimum
    StkSizeInvalid = 6001,
    /// Priority outside the kernel band
    PrioInvalid = 6002,
    /// CPU index outside the available cores
    AffinityInvalid = 6003,
    /// Kernel refused to create the task
    TaskCreate = 6004,
    /// Kernel refused to create a semaphore, reported by the port
    SemCreate = 6005,

    // ============ ISR errors ============
    /// Cannot block from ISR
    PendIsr = 7001,
    /// Cannot create object from ISR
    CreateIsr = 7002,
}

/// Result type alias for runtime operations
pub type OsResult<T> = Result<T, OsError>;

/// errno values returned by [`OsError::errno`]
pub mod errno {
    pub const EPERM: i32 = 1;
    pub const ESRCH: i32 = 3;
    pub const EAGAIN: i32 = 11;
    pub const ENOMEM: i32 = 12;
    pub const EBUSY: i32 = 16;
    pub const EINVAL: i32 = 22;
    pub const EDEADLK: i32 = 35;
    pub const ETIMEDOUT: i32 = 110;
}

impl OsError {
    /// Numeric code of the error
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// POSIX errno for the error
    pub fn errno(self) -> i32 {
        match self {
            OsError::Invalid
            | OsError::InvalidState
            | OsError::StkSizeInvalid
            | OsError::PrioInvalid
            | OsError::AffinityInvalid => errno::EINVAL,
            OsError::Busy | OsError::ResourceConflict => errno::EBUSY,
            OsError::Timeout => errno::ETIMEDOUT,
            OsError::NotFound => errno::ESRCH,
            OsError::TaskCreate => errno::EAGAIN,
            OsError::SemCreate => errno::ENOMEM,
            OsError::PendIsr => errno::EDEADLK,
            OsError::CreateIsr => errno::EPERM,
        }
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

/// A resource request that was not granted
///
/// Carries the identity of the current owner so the caller can tell the
/// user exactly who holds the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResourceConflict {
    pub resource_type: ResourceType,
    pub unit: u16,
    pub owner: Subsystem,
    pub owner_unit: u16,
}

impl fmt::Display for ResourceConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} is used by ", self.resource_type.name(), self.unit)?;
        match self.owner {
            Subsystem::User(id) => write!(f, "user{}.{}", id, self.owner_unit),
            owner => write!(f, "{}{}", owner.name(), self.owner_unit),
        }
    }
}

impl From<ResourceConflict> for OsError {
    fn from(_: ResourceConflict) -> Self {
        OsError::ResourceConflict
    }
}
