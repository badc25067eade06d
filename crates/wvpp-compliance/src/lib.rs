//! Training compliance engine for California workplace violence prevention (SB 553) programs.
//!
//! The crate owns the curriculum progression rules, quiz grading, recurring due-date
//! arithmetic, reminder fan-out, and the organization compliance score. Persistence,
//! notification transport, and record rendering are reached through the collaborator
//! traits exported from each module.

pub mod compliance;
pub mod config;
pub mod error;
pub mod organization;
pub mod reminders;
pub mod telemetry;
pub mod training;

#[cfg(test)]
mod testing;
