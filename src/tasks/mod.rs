//! Background Tasks Module
//!
//! Optional helpers an embedding process can use to drive cache maintenance.
//! The caches never spawn anything themselves.
//!
//! # Tasks
//! - TTL Sweep: removes expired cache entries at a fixed interval

mod sweep;

pub use sweep::spawn_sweep_task;
