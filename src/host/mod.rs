//! Process-facing host for driving an update session over stdin/stdout.

pub mod contract;
pub mod stdio;
