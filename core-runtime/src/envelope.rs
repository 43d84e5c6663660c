//! # State Envelopes
//!
//! Wrappers used for values published to UI observers.
//!
//! - [`Resource`] pairs a payload with a success/error/loading status and an
//!   optional message, so every published transition carries its context.
//! - [`Event`] makes a value one-shot: however many observers (or clones) see
//!   it, [`Event::get_content_if_not_handled`] hands the content out once.
//!
//! ```rust
//! use core_runtime::envelope::{Event, Resource};
//!
//! let event = Event::new(Resource::success(true));
//! let observer_copy = event.clone();
//!
//! assert!(event.get_content_if_not_handled().is_some());
//! assert!(observer_copy.get_content_if_not_handled().is_none());
//! assert_eq!(observer_copy.peek_content().data, Some(true));
//! ```

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome carried by a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Success,
    Error,
    Loading,
}

/// Payload plus status and optional message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource<T> {
    pub status: Status,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> Resource<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status: Status::Error,
            data,
            message: Some(message.into()),
        }
    }

    pub fn loading(data: Option<T>) -> Self {
        Self {
            status: Status::Loading,
            data,
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }

    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }
}

/// One-shot envelope.
///
/// Clones share the handled flag, so a status change delivered through a
/// `watch` channel to several observers is acted upon by only one of them.
#[derive(Debug, Clone)]
pub struct Event<T> {
    content: T,
    handled: Arc<AtomicBool>,
}

impl<T> Event<T> {
    pub fn new(content: T) -> Self {
        Self {
            content,
            handled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the content the first time it is asked for, `None` afterwards.
    pub fn get_content_if_not_handled(&self) -> Option<&T> {
        if self.handled.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(&self.content)
        }
    }

    /// Returns the content whether or not it has been handled.
    pub fn peek_content(&self) -> &T {
        &self.content
    }

    pub fn has_been_handled(&self) -> bool {
        self.handled.load(Ordering::Acquire)
    }
}
