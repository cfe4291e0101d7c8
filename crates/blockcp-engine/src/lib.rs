//! Copy orchestration for blockcp
//!
//! The [`Controller`] owns the whole lifecycle of one copy: preflight
//! validation against the discovered device facts, worker startup, periodic
//! progress sampling, joining, and the final destination flush. It succeeds
//! only when every issued read was either fully written or the failure that
//! stopped it has been reported.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod controller;
pub mod monitor;

pub use controller::Controller;
pub use monitor::ProgressMonitor;
