//! Domain models for the on-call system.

pub mod identity;
pub mod team;
