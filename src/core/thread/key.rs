//! Thread-specific storage
//!
//! Values are opaque words stored per kernel task, so tasks that were not
//! created through the runtime can use keys too. Zero means "no value".

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::core::runtime::Runtime;
use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::port::Kernel;
use crate::types::{KeyId, TaskId};

/// Called with a thread's remaining value when the thread exits
pub type KeyDestructor = fn(usize);

struct KeyEntry {
    destructor: Option<KeyDestructor>,
    values: Vec<(TaskId, usize)>,
}

pub(crate) struct KeyTable {
    next_id: u32,
    keys: BTreeMap<KeyId, KeyEntry>,
}

impl KeyTable {
    pub(crate) const fn new() -> Self {
        KeyTable {
            next_id: 1,
            keys: BTreeMap::new(),
        }
    }

    /// Remove every value `task` holds, returning the destructors to run
    fn take_task_values(&mut self, task: TaskId) -> Vec<(KeyDestructor, usize)> {
        let mut pending = Vec::new();
        for entry in self.keys.values_mut() {
            if let Some(pos) = entry.values.iter().position(|(t, _)| *t == task) {
                let (_, value) = entry.values.swap_remove(pos);
                if let Some(destructor) = entry.destructor {
                    pending.push((destructor, value));
                }
            }
        }
        pending
    }
}

impl<K: Kernel> Runtime<K> {
    /// Create a key, optionally with a destructor for values left at
    /// thread exit
    pub fn key_create(&self, destructor: Option<KeyDestructor>) -> KeyId {
        self.keys.lock(|table| {
            let key = KeyId(table.next_id);
            table.next_id += 1;
            table.keys.insert(
                key,
                KeyEntry {
                    destructor,
                    values: Vec::new(),
                },
            );
            key
        })
    }

    /// Delete a key and every value stored under it; destructors are not run
    pub fn key_delete(&self, key: KeyId) -> OsResult<()> {
        self.keys
            .lock(|table| table.keys.remove(&key))
            .map(|_| ())
            .ok_or(OsError::NotFound)
    }

    /// Store `value` for the calling task; zero removes the value
    pub fn set_specific(&self, key: KeyId, value: usize) -> OsResult<()> {
        let task = self.kernel.current_task();
        self.keys.lock(|table| {
            let entry = table.keys.get_mut(&key).ok_or(OsError::NotFound)?;
            let slot = entry.values.iter().position(|(t, _)| *t == task);
            match (slot, value) {
                (Some(pos), 0) => {
                    entry.values.swap_remove(pos);
                }
                (Some(pos), v) => entry.values[pos].1 = v,
                (None, 0) => {}
                (None, v) => entry.values.push((task, v)),
            }
            Ok(())
        })
    }

    /// Value the calling task stored under `key`
    pub fn get_specific(&self, key: KeyId) -> Option<usize> {
        let task = self.kernel.current_task();
        self.keys.lock(|table| {
            table
                .keys
                .get(&key)?
                .values
                .iter()
                .find(|(t, _)| *t == task)
                .map(|(_, v)| *v)
        })
    }

    /// Drop every value of `task` and run the key destructors
    ///
    /// Destructors run outside the critical section.
    pub(crate) fn key_thread_exit(&self, task: TaskId) {
        let pending = critical_section(|cs| self.keys.get(cs).take_task_values(task));
        for (destructor, value) in pending {
            destructor(value);
        }
    }
}
