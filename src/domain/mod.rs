//! Domain layer types and invariants.

pub mod address;
pub mod error;
pub mod job;
pub mod options;
