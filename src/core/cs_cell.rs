//! Critical section protected cell
//!
//! Wrapper for data that must only be touched within the critical section.

use core::cell::{RefCell, RefMut};

use ::critical_section::Mutex;

use crate::critical::{critical_section, CriticalSection};

/// A cell that can only be accessed within a critical section.
pub struct CsCell<T>(Mutex<RefCell<T>>);

impl<T> CsCell<T> {
    /// Create a new CsCell
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self(Mutex::new(RefCell::new(value)))
    }

    /// Borrow the inner value for the lifetime of the critical section
    #[inline(always)]
    pub fn get<'cs>(&'cs self, cs: CriticalSection<'cs>) -> RefMut<'cs, T> {
        self.0.borrow_ref_mut(cs)
    }

    /// Enter the critical section and run `f` on the inner value
    #[inline]
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section(|cs| f(&mut self.get(cs)))
    }
}

impl<T: Default> Default for CsCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
