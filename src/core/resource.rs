//! Hardware resource lock manager
//!
//! Keeps one owner slot per physical unit (GPIO pins, hardware timers).
//! A unit is owned by at most one subsystem unit at a time; a refused
//! request reports who holds it. All table access happens inside the
//! critical section, so locking and unlocking are safe from interrupts.

use alloc::vec;
use alloc::vec::Vec;

use crate::core::cs_cell::CsCell;
use crate::error::{OsError, OsResult, ResourceConflict};
use crate::types::{ResourceType, Subsystem};

/// Outcome of [`ResourceManager::lock`]
///
/// When `granted` is false, `owner` and `owner_unit` name the current
/// holder instead of the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResourceLock {
    pub resource_type: ResourceType,
    pub unit: u16,
    pub owner: Subsystem,
    pub owner_unit: u16,
    pub granted: bool,
}

impl ResourceLock {
    #[inline]
    pub fn granted(&self) -> bool {
        self.granted
    }

    /// Turn a refused lock into a [`ResourceConflict`]
    pub fn into_result(self) -> Result<Self, ResourceConflict> {
        if self.granted {
            Ok(self)
        } else {
            Err(ResourceConflict {
                resource_type: self.resource_type,
                unit: self.unit,
                owner: self.owner,
                owner_unit: self.owner_unit,
            })
        }
    }
}

/// `true` if `lock` was granted
#[inline]
pub fn resource_granted(lock: &ResourceLock) -> bool {
    lock.granted()
}

type Slot = Option<(Subsystem, u16)>;

struct ResourceTable {
    gpio: Vec<Slot>,
    timer: Vec<Slot>,
}

impl ResourceTable {
    fn slots(&mut self, resource_type: ResourceType) -> &mut Vec<Slot> {
        match resource_type {
            ResourceType::Gpio => &mut self.gpio,
            ResourceType::Timer => &mut self.timer,
        }
    }
}

/// Owner table for every physical resource
pub struct ResourceManager {
    table: CsCell<ResourceTable>,
}

impl ResourceManager {
    /// Create a table with the given number of units per type
    ///
    /// Timer 0 is reserved for the system tick.
    pub fn new(gpio_units: u16, timer_units: u16) -> Self {
        let mut timer = vec![None; timer_units as usize];
        if let Some(slot) = timer.first_mut() {
            *slot = Some((Subsystem::System, 0));
        }

        ResourceManager {
            table: CsCell::new(ResourceTable {
                gpio: vec![None; gpio_units as usize],
                timer,
            }),
        }
    }

    /// Request ownership of a unit
    ///
    /// # Arguments
    /// * `unit` - unit to lock, or `None` for the first free one
    /// * `owner`, `owner_unit` - identity of the requesting driver unit
    ///
    /// # Returns
    /// A lock descriptor, granted or naming the current owner.
    /// `Err(NotFound)` if `unit` is out of range or no unit is free.
    pub fn lock(
        &self,
        resource_type: ResourceType,
        unit: Option<u16>,
        owner: Subsystem,
        owner_unit: u16,
    ) -> OsResult<ResourceLock> {
        let lock = self.table.lock(|table| -> OsResult<ResourceLock> {
            let slots = table.slots(resource_type);

            let unit = match unit {
                Some(unit) => unit,
                None => slots.iter().position(Option::is_none).ok_or(OsError::NotFound)? as u16,
            };
            let slot = slots.get_mut(unit as usize).ok_or(OsError::NotFound)?;

            let lock = match *slot {
                None => {
                    *slot = Some((owner, owner_unit));
                    ResourceLock { resource_type, unit, owner, owner_unit, granted: true }
                }
                Some(current) if current == (owner, owner_unit) => {
                    ResourceLock { resource_type, unit, owner, owner_unit, granted: true }
                }
                Some((current, current_unit)) => ResourceLock {
                    resource_type,
                    unit,
                    owner: current,
                    owner_unit: current_unit,
                    granted: false,
                },
            };
            Ok(lock)
        })?;

        if lock.granted {
            crate::debug!("{} {} locked by {}{}", resource_type.name(), lock.unit, owner.name(), owner_unit);
        } else {
            crate::warn!(
                "{} {} is used by {}{}",
                resource_type.name(),
                lock.unit,
                lock.owner.name(),
                lock.owner_unit
            );
        }
        Ok(lock)
    }

    /// Release a unit; a free unit stays free
    pub fn unlock(&self, resource_type: ResourceType, unit: u16) -> OsResult<()> {
        self.table.lock(|table| {
            let slot = table.slots(resource_type).get_mut(unit as usize).ok_or(OsError::NotFound)?;
            *slot = None;
            Ok(())
        })
    }

    /// Release every unit held by one driver unit
    ///
    /// # Returns
    /// Number of units released
    pub fn unlock_all(&self, owner: Subsystem, owner_unit: u16) -> usize {
        let released = self.table.lock(|table| {
            let mut released = 0;
            for slot in table.gpio.iter_mut().chain(table.timer.iter_mut()) {
                if *slot == Some((owner, owner_unit)) {
                    *slot = None;
                    released += 1;
                }
            }
            released
        });
        crate::debug!("{}{} released {} resources", owner.name(), owner_unit, released);
        released
    }

    /// Current owner of a unit
    pub fn owner(&self, resource_type: ResourceType, unit: u16) -> OsResult<Option<(Subsystem, u16)>> {
        self.table
            .lock(|table| table.slots(resource_type).get(unit as usize).copied())
            .ok_or(OsError::NotFound)
    }

    /// Number of units of a type
    pub fn units(&self, resource_type: ResourceType) -> u16 {
        self.table.lock(|table| table.slots(resource_type).len() as u16)
    }
}
