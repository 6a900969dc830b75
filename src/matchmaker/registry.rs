//! Connection registry: bidirectional mapping between stable user identities
//! and ephemeral transport connections
//!
//! The registry is a plain container; it is owned by the matchmaker's state
//! lock so registry and queue mutations share one critical section.

use crate::types::{ConnectionHandle, ConnectionId, UserId};
use std::collections::HashMap;

/// Tracks which users are online and how to reach them
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// user id -> live connection handle
    users: HashMap<UserId, ConnectionHandle>,
    /// connection id -> user id, for disconnect resolution
    connections: HashMap<ConnectionId, UserId>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to a user identity.
    ///
    /// Last connection wins: a prior binding for the same user is replaced
    /// and its handle is orphaned; closing the old socket is the transport
    /// layer's job, not the registry's.
    pub fn register(&mut self, user_id: UserId, handle: ConnectionHandle) {
        if let Some(previous) = self.users.insert(user_id.clone(), handle.clone()) {
            self.connections.remove(&previous.id);
        }
        self.connections.insert(handle.id, user_id);
    }

    /// Remove both directions of the mapping for a connection.
    ///
    /// Idempotent: unregistering an unknown handle is a no-op. A stale handle
    /// that was superseded by a newer registration for the same user does not
    /// evict the newer binding.
    pub fn unregister(&mut self, connection_id: ConnectionId) -> Option<UserId> {
        let user_id = self.connections.remove(&connection_id)?;

        match self.users.get(&user_id) {
            Some(handle) if handle.id == connection_id => {
                self.users.remove(&user_id);
            }
            _ => {}
        }

        Some(user_id)
    }

    /// Live delivery target for a user, if online
    pub fn connection_for(&self, user_id: &str) -> Option<&ConnectionHandle> {
        self.users.get(user_id)
    }

    /// Resolve which user a connection belongs to
    pub fn user_for(&self, connection_id: ConnectionId) -> Option<&UserId> {
        self.connections.get(&connection_id)
    }

    /// Whether the user currently has a live connection
    pub fn is_online(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    /// Number of currently bound users
    pub fn online_count(&self) -> usize {
        self.users.len()
    }
}
