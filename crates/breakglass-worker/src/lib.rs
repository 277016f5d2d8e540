//! Background tasks for Breakglass.
//!
//! Currently a single periodic task: the expiry sweep, which closes
//! impersonations left active past their deadline.

pub mod sweeper;

pub use sweeper::ExpirySweeper;
