//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the player core crates:
//! - Logging and tracing setup
//! - Configuration management
//! - Lifecycle event bus
//! - `Event`/`Resource` envelopes for values published to observers
//!
//! ## Overview
//!
//! Nothing here knows about catalogs or playback engines beyond the bridge
//! traits; it establishes the logging conventions, validated configuration
//! and event broadcasting used by the rest of the workspace.

pub mod config;
pub mod envelope;
pub mod error;
pub mod events;
pub mod logging;

pub use envelope::{Event, Resource, Status};
pub use error::{Error, Result};
