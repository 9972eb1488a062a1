//! Domain logic for the crit walk tracker.
//!
//! Everything in this crate is free of I/O. Persistence lives in
//! `critwalk-db`, orchestration in `critwalk-tracker`.

pub mod crit_walk;
pub mod equipment;
pub mod error;
pub mod failure_tracking;
pub mod retention;
pub mod roles;
pub mod status;
pub mod storage;
pub mod types;
