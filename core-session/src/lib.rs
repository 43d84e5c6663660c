//! # Core Session
//!
//! Connection to the playback engine and the observable state derived from
//! it: connection and network signals, transport snapshot, library root and
//! the enriched now-playing item.
//!
//! Obtain the process-wide connection with [`get_or_create`], observe it
//! through the `watch` receivers on [`SessionConnection`], and call
//! [`SessionConnection::release`] when the host tears down.

pub mod connection;
pub mod error;
pub mod registry;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use connection::{SessionConnection, SessionOptions};
pub use error::{Result, SessionError};
pub use registry::{current, get_or_create};
pub use state::{
    is_network_failure, ConnectionSignal, ConnectionStatus, NetworkSignal, NetworkStatus,
    TransportState, NETWORK_ERROR_MESSAGE,
};
