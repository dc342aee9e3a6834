// src/backend/session.rs

//! Connection-state tracking shared by the backend handles.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::{PubSubError, Result};

const CREATED: u8 = 0;
const CONNECTED: u8 = 1;
const CLOSED: u8 = 2;

/// Lock-free session state for a transport handle.
///
/// Handles start out created-but-disconnected, move to connected via
/// [`connect`](SessionState::connect), and to closed via
/// [`close`](SessionState::close). A closed session can be revived by
/// `connect`; the connector relies on this when it reconnects its
/// primary handle after a disconnect drained the pool.
pub(crate) struct SessionState(AtomicU8);

impl SessionState {
    /// New session, not yet connected.
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(CREATED))
    }

    /// New session that is usable immediately, for handles duplicated
    /// from an already-connected session.
    pub(crate) fn connected() -> Self {
        Self(AtomicU8::new(CONNECTED))
    }

    /// Mark the session connected.
    pub(crate) fn connect(&self) {
        self.0.store(CONNECTED, Ordering::Release);
    }

    /// Mark the session closed. Returns `false` when it already was,
    /// which lets callers make their teardown idempotent.
    pub(crate) fn close(&self) -> bool {
        self.0.swap(CLOSED, Ordering::AcqRel) != CLOSED
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.0.load(Ordering::Acquire) == CONNECTED
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(PubSubError::NotConnected)
        }
    }
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_start_disconnected() {
        // ---
        let state = SessionState::new();
        assert!(!state.is_connected());
        assert!(matches!(
            state.ensure_connected(),
            Err(PubSubError::NotConnected)
        ));
    }

    #[test]
    fn close_reports_the_first_transition_only() {
        // ---
        let state = SessionState::new();
        state.connect();
        assert!(state.close());
        assert!(!state.close());
        assert!(!state.is_connected());
    }

    #[test]
    fn connect_revives_a_closed_session() {
        // ---
        let state = SessionState::new();
        state.connect();
        state.close();
        state.connect();
        assert!(state.is_connected());
    }
}
