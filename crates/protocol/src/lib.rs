//! # cr-protocol
//!
//! Core protocol definitions and data models for control-room.
//!
//! This crate defines all shared data structures used for:
//! - Pipeline definition parsing (YAML stage graphs, TOML config)
//! - Runtime node state and run parameters
//! - The REST contract with the processing backend
//! - Inter-process communication between a front end and Core
//!
//! ## Modules
//!
//! - [`pipeline_models`]: Stage ids, edges and pipeline definitions
//! - [`process_models`]: Node status, run parameters and node snapshots
//! - [`api_models`]: Request/response bodies of the backend REST API
//! - [`config_models`]: Global configuration from config.toml
//! - [`ipc`]: Operations and Events for front end/Core communication
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs and chrono
//! - TypeScript generation: All types derive `TS` for browser dashboards
//! - Independent compilation: No dependencies on other control-room crates

pub mod api_models;
pub mod config_models;
pub mod ipc;
pub mod pipeline_models;
pub mod process_models;

// Re-export all public types for convenience
pub use api_models::*;
pub use config_models::*;
pub use ipc::*;
pub use pipeline_models::*;
pub use process_models::*;
