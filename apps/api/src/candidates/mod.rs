//! Candidate intake workflow and its read path.

pub mod handlers;
pub mod intake;
pub mod store;
pub mod uploads;
pub mod validation;

#[cfg(test)]
pub mod memory;
