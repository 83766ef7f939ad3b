//! Command implementations

pub mod checksum;
pub mod sign;
