//! Core runtime modules
//!
//! Contains configuration, critical sections, the runtime context, thread
//! management, the resource manager and the job scheduler.

pub mod config;
pub mod critical;
pub mod cs_cell;
pub mod error;
pub mod runtime;
pub mod thread;
pub mod types;

#[cfg(feature = "job")]
pub mod job;
#[cfg(feature = "resource")]
pub mod resource;
