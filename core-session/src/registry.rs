//! Process-wide connection registry.
//!
//! At most one live [`SessionConnection`] exists per process. Callers asking
//! for a connection while one is registered get the existing instance; the
//! registration is dropped when that connection is released.

use crate::connection::{SessionConnection, SessionOptions};
use bridge_traits::{SessionConnector, SessionToken};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

static INSTANCE: Mutex<Option<Arc<SessionConnection>>> = parking_lot::const_mutex(None);

/// Returns the registered connection, creating and connecting one if none
/// is live.
///
/// A live connection is returned even when `token` names a different
/// service; release it first to switch engines.
pub fn get_or_create(
    token: SessionToken,
    connector: Arc<dyn SessionConnector>,
    options: SessionOptions,
) -> Arc<SessionConnection> {
    let mut slot = INSTANCE.lock();

    if let Some(existing) = slot.as_ref().filter(|existing| !existing.is_released()) {
        if existing.token() != &token {
            warn!(
                registered = %existing.token(),
                requested = %token,
                "Reusing connection registered for another service"
            );
        }
        return Arc::clone(existing);
    }

    debug!(service = %token, "Registering new playback engine connection");
    let connection = SessionConnection::connect(token, connector, options);
    *slot = Some(Arc::clone(&connection));
    connection
}

pub fn current() -> Option<Arc<SessionConnection>> {
    INSTANCE
        .lock()
        .as_ref()
        .filter(|existing| !existing.is_released())
        .cloned()
}

/// Drops the registration if it points at `connection`.
pub(crate) fn forget(connection: &SessionConnection) {
    let mut slot = INSTANCE.lock();
    if slot
        .as_ref()
        .is_some_and(|existing| std::ptr::eq(Arc::as_ptr(existing), connection))
    {
        // Taken out so the last strong reference is not dropped under the lock.
        let released = slot.take();
        drop(slot);
        drop(released);
    }
}
