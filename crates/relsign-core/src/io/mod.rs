//! IO modules - filesystem and container side effects

pub mod entries;
pub mod fs;
