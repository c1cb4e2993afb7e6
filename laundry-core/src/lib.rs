//! # laundry-core
//!
//! Domain types for laundry.
//!
//! This crate provides:
//! - Machine records and the machine lifecycle
//! - Simulated cost accounting shared by every component
//! - Core error types

pub mod cost;
pub mod error;
pub mod machine;

pub use cost::{units, CostAccountant, CostMeter, CostUnits};
pub use error::HardwareFault;
pub use machine::{MachineRecord, MachineStatus};
