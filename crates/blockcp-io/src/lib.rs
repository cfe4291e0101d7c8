//! The blockcp copy pipeline
//!
//! This crate implements the parallel asynchronous copy core: N worker
//! threads, each owning one sector-aligned buffer and one io_uring submission
//! ring, claim non-overlapping blocks from a shared offset cursor and chain
//! each read completion directly into the paired write on the same slot.
//!
//! The design relies on completion delivery staying on the submitting thread:
//! a worker only ever reaps its own ring, so a slot's mutable state is touched
//! by exactly one thread and no per-slot locking is needed. The only shared
//! state is a handful of atomics - the offset cursor, the pending-operation
//! count, the read-exhaustion and error flags, and the byte counters.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod cursor;
pub mod pump;
pub mod ring;
pub mod slot;
pub mod worker;

pub use buffer::AlignedBuf;
pub use cursor::{BlockClaim, BlockCursor};
pub use pump::{CopyPump, IssueOutcome};
pub use ring::SlotRing;
pub use slot::IoSlot;
pub use worker::Worker;
