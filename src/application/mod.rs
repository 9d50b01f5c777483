//! Application layer: the print operation and process-level errors.

pub mod error;
pub mod print;
