//! Job arena and run queues
//!
//! Every job lives in one arena slot whose [`JobState`] says which queue,
//! if any, holds it. Moving a job always unlinks it first, so it can never
//! sit in both queues.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use super::{Job, JobCallback};
use crate::error::{OsError, OsResult};
use crate::types::{tick_after, tick_reached, OsTick};

/// Where a job currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JobState {
    Idle,
    Runnable,
    Scheduled(OsTick),
}

struct JobSlot {
    generation: u32,
    in_use: bool,
    state: JobState,
    callback: Option<JobCallback>,
}

pub(crate) struct JobQueues {
    slots: Vec<JobSlot>,
    free: Vec<u32>,
    runnable: VecDeque<u32>,
    /// Ascending by deadline, FIFO among equal deadlines
    scheduled: VecDeque<u32>,
}

impl JobQueues {
    pub(crate) const fn new() -> Self {
        JobQueues {
            slots: Vec::new(),
            free: Vec::new(),
            runnable: VecDeque::new(),
            scheduled: VecDeque::new(),
        }
    }

    pub(crate) fn alloc(&mut self) -> Job {
        let job = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.in_use = true;
                Job { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(JobSlot {
                    generation: 0,
                    in_use: true,
                    state: JobState::Idle,
                    callback: None,
                });
                Job { index, generation: 0 }
            }
        };

        // A job sits in at most one queue, so queues sized to the arena never grow
        let jobs = self.slots.len();
        self.runnable.reserve(jobs - self.runnable.len());
        self.scheduled.reserve(jobs - self.scheduled.len());
        job
    }

    fn slot_mut(&mut self, job: Job) -> OsResult<&mut JobSlot> {
        match self.slots.get_mut(job.index as usize) {
            Some(slot) if slot.in_use && slot.generation == job.generation => Ok(slot),
            _ => Err(OsError::NotFound),
        }
    }

    pub(crate) fn release(&mut self, job: Job) -> OsResult<()> {
        self.unlink(job)?;
        let slot = self.slot_mut(job)?;
        slot.in_use = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(job.index);
        Ok(())
    }

    pub(crate) fn state(&mut self, job: Job) -> OsResult<JobState> {
        self.slot_mut(job).map(|s| s.state)
    }

    /// Remove a job from whichever queue holds it
    pub(crate) fn unlink(&mut self, job: Job) -> OsResult<()> {
        let slot = self.slot_mut(job)?;
        let state = slot.state;
        slot.state = JobState::Idle;
        slot.callback = None;

        let queue = match state {
            JobState::Idle => return Ok(()),
            JobState::Runnable => &mut self.runnable,
            JobState::Scheduled(_) => &mut self.scheduled,
        };
        if let Some(pos) = queue.iter().position(|&i| i == job.index) {
            queue.remove(pos);
        }
        Ok(())
    }

    pub(crate) fn push_runnable(&mut self, job: Job, callback: JobCallback) -> OsResult<()> {
        self.unlink(job)?;
        let slot = self.slot_mut(job)?;
        slot.state = JobState::Runnable;
        slot.callback = Some(callback);
        self.runnable.push_back(job.index);
        Ok(())
    }

    pub(crate) fn insert_scheduled(&mut self, job: Job, deadline: OsTick, callback: JobCallback) -> OsResult<()> {
        self.unlink(job)?;
        let slot = self.slot_mut(job)?;
        slot.state = JobState::Scheduled(deadline);
        slot.callback = Some(callback);

        // First entry with a strictly later deadline marks the insertion point
        let slots = &self.slots;
        let pos = self
            .scheduled
            .iter()
            .position(|&i| match slots[i as usize].state {
                JobState::Scheduled(d) => tick_after(d, deadline),
                _ => false,
            })
            .unwrap_or(self.scheduled.len());
        self.scheduled.insert(pos, job.index);
        Ok(())
    }

    fn deadline_of(&self, index: u32) -> Option<OsTick> {
        match self.slots.get(index as usize)?.state {
            JobState::Scheduled(d) => Some(d),
            _ => None,
        }
    }

    /// Deadline of the earliest scheduled job
    pub(crate) fn next_deadline(&self) -> Option<OsTick> {
        self.scheduled.front().and_then(|&i| self.deadline_of(i))
    }

    pub(crate) fn has_runnable(&self) -> bool {
        !self.runnable.is_empty()
    }

    /// Take the next job to run: runnable first, then a due scheduled job
    pub(crate) fn pop_ready(&mut self, now: OsTick) -> Option<(Job, JobCallback)> {
        let index = match self.runnable.pop_front() {
            Some(index) => index,
            None => {
                let deadline = self.next_deadline()?;
                if !tick_reached(now, deadline) {
                    return None;
                }
                self.scheduled.pop_front()?
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.state = JobState::Idle;
        let callback = slot.callback.take()?;
        Some((Job { index, generation: slot.generation }, callback))
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use super::*;

    fn noop() -> JobCallback {
        Arc::new(|_: Job| {})
    }

    #[test]
    fn test_queues_sized_to_arena() {
        let mut queues = JobQueues::new();
        let jobs: Vec<Job> = (0..8).map(|_| queues.alloc()).collect();
        let runnable_cap = queues.runnable.capacity();
        let scheduled_cap = queues.scheduled.capacity();
        assert!(runnable_cap >= jobs.len());
        assert!(scheduled_cap >= jobs.len());

        for &job in &jobs {
            queues.push_runnable(job, noop()).unwrap();
        }
        for (i, &job) in jobs.iter().enumerate() {
            queues.insert_scheduled(job, (jobs.len() - i) as OsTick, noop()).unwrap();
        }

        assert_eq!(queues.runnable.capacity(), runnable_cap);
        assert_eq!(queues.scheduled.capacity(), scheduled_cap);
    }
}
