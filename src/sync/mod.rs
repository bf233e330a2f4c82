//! Synchronization primitives
//!
//! Contains mutexes, condition variables and once guards.

pub mod cond;
pub mod mutex;
pub mod once;
