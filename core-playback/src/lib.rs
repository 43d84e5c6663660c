//! # Playback Orchestration
//!
//! Turns "play this item" requests into transport commands on the connected
//! playback engine.
//!
//! ## Overview
//!
//! This crate handles:
//! - Re-tap semantics for the item already loaded (pause, resume, restart)
//! - Queue resolution from an optional parent browse scope
//! - Background execution of requests on the orchestrator's own scope

pub mod error;
pub mod orchestrator;
pub mod session;

pub use error::{PlaybackError, Result};
pub use orchestrator::{PlayOptions, PlayOutcome, PlaybackOrchestrator};
pub use session::PlaybackSession;
