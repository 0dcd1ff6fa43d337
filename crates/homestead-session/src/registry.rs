//! Mark/sweep bookkeeping for live endpoints.
//!
//! ```text
//! insert() ──→ activate() ──→ mark_for_removal() ──→ sweep()
//!                 │                   │                 │
//!                 ▼                   ▼                 ▼
//!             [Active]        [PendingRemoval]      [Closed, erased]
//! ```
//!
//! Marking and sweeping are separate so that the network loop can flag a
//! dead connection from anywhere in its poll phase and erase it exactly
//! once, after the poll phase is over.

use std::collections::HashMap;

use homestead_transport::ConnectionId;

use crate::{Endpoint, EndpointState, SessionError};

/// All endpoints known to the network thread.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<ConnectionId, Endpoint>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a newly accepted endpoint.
    pub fn insert(&mut self, endpoint: Endpoint) {
        self.endpoints.insert(endpoint.id(), endpoint);
    }

    /// Moves a `Connecting` endpoint to `Active`.
    pub fn activate(&mut self, id: ConnectionId) -> Result<(), SessionError> {
        self.endpoints
            .get_mut(&id)
            .ok_or(SessionError::UnknownConnection(id))?
            .transition(EndpointState::Active)
    }

    /// Flags an endpoint for removal at the next sweep.
    ///
    /// Returns `true` if this call did the marking. Marking an endpoint
    /// that is already pending, or unknown, is a no-op.
    pub fn mark_for_removal(&mut self, id: ConnectionId) -> bool {
        let Some(endpoint) = self.endpoints.get_mut(&id) else {
            return false;
        };
        match endpoint.transition(EndpointState::PendingRemoval) {
            Ok(()) => {
                tracing::debug!(connection_id = %id, "endpoint marked for removal");
                true
            }
            Err(_) => false,
        }
    }

    /// Closes and erases every endpoint marked for removal.
    ///
    /// Returns the closed endpoints so the caller can release their
    /// resources and notify the simulation side.
    pub fn sweep(&mut self) -> Vec<Endpoint> {
        let ids: Vec<ConnectionId> = self
            .endpoints
            .values()
            .filter(|e| e.state() == EndpointState::PendingRemoval)
            .map(Endpoint::id)
            .collect();

        let mut closed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(mut endpoint) = self.endpoints.remove(&id) {
                // PendingRemoval → Closed is always valid here.
                let _ = endpoint.transition(EndpointState::Closed);
                closed.push(endpoint);
            }
        }
        closed
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Endpoint> {
        self.endpoints.get(&id)
    }

    /// Returns `true` if the endpoint exists and is `Active`.
    pub fn is_active(&self, id: ConnectionId) -> bool {
        self.endpoints
            .get(&id)
            .is_some_and(|e| e.state().is_active())
    }

    /// Every tracked connection id.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.endpoints.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn registry_with_active(ids: &[u64]) -> EndpointRegistry {
        let mut reg = EndpointRegistry::new();
        for &id in ids {
            reg.insert(Endpoint::new(cid(id), "127.0.0.1:9000".parse().unwrap()));
            reg.activate(cid(id)).unwrap();
        }
        reg
    }

    #[test]
    fn test_activate_unknown_connection_errors() {
        let mut reg = EndpointRegistry::new();
        assert!(matches!(
            reg.activate(cid(5)),
            Err(SessionError::UnknownConnection(_))
        ));
    }

    #[test]
    fn test_mark_for_removal_keeps_endpoint_until_sweep() {
        let mut reg = registry_with_active(&[1, 2]);
        assert!(reg.mark_for_removal(cid(1)));
        assert_eq!(reg.len(), 2);
        assert!(!reg.is_active(cid(1)));
        assert!(reg.is_active(cid(2)));
    }

    #[test]
    fn test_mark_for_removal_twice_is_noop() {
        let mut reg = registry_with_active(&[1]);
        assert!(reg.mark_for_removal(cid(1)));
        assert!(!reg.mark_for_removal(cid(1)));
        assert_eq!(reg.sweep().len(), 1);
    }

    #[test]
    fn test_mark_for_removal_unknown_returns_false() {
        let mut reg = EndpointRegistry::new();
        assert!(!reg.mark_for_removal(cid(3)));
    }

    #[test]
    fn test_sweep_removes_only_marked_and_closes_them() {
        let mut reg = registry_with_active(&[1, 2, 3]);
        reg.mark_for_removal(cid(1));
        reg.mark_for_removal(cid(3));

        let mut closed = reg.sweep();
        closed.sort_by_key(Endpoint::id);

        assert_eq!(closed.len(), 2);
        assert_eq!(closed[0].id(), cid(1));
        assert_eq!(closed[1].id(), cid(3));
        assert!(closed.iter().all(|e| e.state() == EndpointState::Closed));
        assert_eq!(reg.ids(), vec![cid(2)]);
    }

    #[test]
    fn test_sweep_with_nothing_marked_returns_empty() {
        let mut reg = registry_with_active(&[1]);
        assert!(reg.sweep().is_empty());
        assert_eq!(reg.len(), 1);
    }
}
