//! Test infrastructure for the forwarding table crates
//!
//! Provides:
//! - An in-memory map store ([`MemoryBackend`]) usable without root
//! - Table fixtures and random entry generators
//! - Order-independent query verification

pub mod fixtures;
mod memory;
mod verification;

pub use fixtures::*;
pub use memory::MemoryBackend;
pub use verification::*;
