//! # laundry-server
//!
//! Request handling for laundry.
//!
//! This crate provides:
//! - Request/response types and route resolution
//! - The workflow engine for reserving, inspecting and starting machines
//! - Identity and machine-control boundaries
//! - Configuration and in-process metrics
//! - A load-simulation harness for cost analysis

pub mod config;
pub mod control;
pub mod error;
pub mod identity;
pub mod message;
pub mod metrics;
pub mod route;
pub mod simulation;
pub mod workflow;

pub use config::{AuthConfig, CacheConfig, Config, ConfigError, MetricsConfig, SimulationConfig};
pub use control::{MachineControlBoundary, MachineController, SimulatedController};
pub use error::{AuthError, WorkflowError};
pub use identity::{IdentityBoundary, IdentityProvider, TokenIdentityProvider};
pub use message::{HttpMethod, Request, Response, StatusCode};
pub use metrics::Metrics;
pub use route::Route;
pub use simulation::{RunReport, Simulation, SimulationReport};
pub use workflow::WorkflowEngine;
