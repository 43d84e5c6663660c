//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//!
//! The playback engine itself is always host-provided; desktop hosts plug in
//! their own `SessionConnector`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! // Pass to CoreConfig::builder().http_client(http_client)
//! ```

mod http;

pub use http::ReqwestHttpClient;
