//! Domain types shared by the synthesis gateway crates.
//!
//! Lives at the bottom of the dependency graph: no internal crate
//! dependencies, no I/O.

pub mod error;
pub mod job;
pub mod synthesis;
pub mod types;
