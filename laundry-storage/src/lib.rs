//! # laundry-storage
//!
//! Storage layer for laundry.
//!
//! This crate provides:
//! - The authoritative machine store
//! - A bounded read cache with FIFO eviction

pub mod cache;
pub mod store;

pub use cache::ReadCache;
pub use store::MachineStore;
