//! # cr-core
//!
//! Dependency-aware execution engine and session state for control-room.
//!
//! This crate provides:
//! - Configuration loading from the `.control-room/` directory
//! - A backend abstraction over the processing REST API, with HTTP and mock
//!   adapters
//! - Graph utilities for stage dependencies
//! - The execution engine: dependency resolution, submission, polling,
//!   stop and reset with downstream invalidation
//! - Session state, output caching and persistence
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and management
//! - [`backend`]: Backend trait and adapter implementations
//! - [`graph`]: Dependency and downstream maps, traversal, ordering
//! - [`params`]: Run parameter completeness and validation
//! - [`engine`]: Pipeline execution engine
//! - [`state`]: Node state, output cache and the session manager
//! - [`store`]: Session persistence
//! - [`init`]: `.control-room/` scaffolding

pub mod backend;
pub mod config;
pub mod engine;
pub mod graph;
pub mod init;
pub mod params;
pub mod state;
pub mod store;
