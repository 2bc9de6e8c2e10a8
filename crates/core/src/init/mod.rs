//! Initialization module for creating .control-room directory structures.
//!
//! This module initializes a project by generating a `.control-room/`
//! directory with pre-configured templates for:
//! - Global configuration (`config.toml`)
//! - Pipeline definitions (`pipelines/*.yaml`)
//!
//! # Example
//!
//! ```no_run
//! use cr_core::init::{InitOptions, generate_control_room_structure};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = InitOptions {
//!     target_dir: PathBuf::from("."),
//!     force: false,
//!     minimal: false,
//! };
//!
//! generate_control_room_structure(options).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod templates;

pub use error::{InitError, InitResult};
pub use generator::{generate_control_room_structure, InitOptions};
pub use templates::{get_template, list_templates};
