//! A single remote peer as seen by the network thread.

use std::fmt;
use std::net::SocketAddr;

use homestead_transport::ConnectionId;

use crate::SessionError;

// ---------------------------------------------------------------------------
// EndpointState
// ---------------------------------------------------------------------------

/// Lifecycle of a connection endpoint.
///
/// ```text
///   Connecting ──→ Active ──→ PendingRemoval ──→ Closed
/// ```
///
/// Transitions only move forward one step at a time. An endpoint marked
/// `PendingRemoval` still exists until the next sweep, so nothing is ever
/// erased while the network loop is iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointState {
    Connecting,
    Active,
    PendingRemoval,
    Closed,
}

impl EndpointState {
    /// Returns `true` if packets from this endpoint should be delivered.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// The following state, or `None` once closed.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Connecting => Some(Self::Active),
            Self::Active => Some(Self::PendingRemoval),
            Self::PendingRemoval => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Active => write!(f, "Active"),
            Self::PendingRemoval => write!(f, "PendingRemoval"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// One reliable-channel peer.
#[derive(Debug, Clone)]
pub struct Endpoint {
    id: ConnectionId,
    peer: SocketAddr,
    state: EndpointState,
}

impl Endpoint {
    /// A freshly accepted connection, in `Connecting`.
    pub fn new(id: ConnectionId, peer: SocketAddr) -> Self {
        Self {
            id,
            peer,
            state: EndpointState::Connecting,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Moves to `target` if the state machine allows it.
    ///
    /// # Errors
    /// [`SessionError::InvalidTransition`] for anything but the next state.
    pub fn transition(&mut self, target: EndpointState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(target) {
            return Err(SessionError::InvalidTransition {
                id: self.id,
                from: self.state,
                to: target,
            });
        }
        tracing::trace!(connection_id = %self.id, from = %self.state, to = %target, "endpoint transition");
        self.state = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint::new(ConnectionId::new(1), "127.0.0.1:4000".parse().unwrap())
    }

    #[test]
    fn test_endpoint_state_next_follows_strict_order() {
        assert_eq!(EndpointState::Connecting.next(), Some(EndpointState::Active));
        assert_eq!(
            EndpointState::Active.next(),
            Some(EndpointState::PendingRemoval)
        );
        assert_eq!(
            EndpointState::PendingRemoval.next(),
            Some(EndpointState::Closed)
        );
        assert_eq!(EndpointState::Closed.next(), None);
    }

    #[test]
    fn test_endpoint_state_can_transition_to() {
        assert!(EndpointState::Connecting.can_transition_to(EndpointState::Active));
        assert!(!EndpointState::Connecting.can_transition_to(EndpointState::Closed));
        assert!(!EndpointState::Closed.can_transition_to(EndpointState::Connecting));
        assert!(!EndpointState::Active.can_transition_to(EndpointState::Active));
    }

    #[test]
    fn test_endpoint_state_only_active_is_active() {
        assert!(EndpointState::Active.is_active());
        assert!(!EndpointState::Connecting.is_active());
        assert!(!EndpointState::PendingRemoval.is_active());
    }

    #[test]
    fn test_endpoint_state_display() {
        assert_eq!(EndpointState::PendingRemoval.to_string(), "PendingRemoval");
    }

    #[test]
    fn test_transition_full_lifecycle_succeeds() {
        let mut e = endpoint();
        e.transition(EndpointState::Active).unwrap();
        e.transition(EndpointState::PendingRemoval).unwrap();
        e.transition(EndpointState::Closed).unwrap();
        assert_eq!(e.state(), EndpointState::Closed);
    }

    #[test]
    fn test_transition_skipping_a_step_errors() {
        let mut e = endpoint();
        let err = e.transition(EndpointState::PendingRemoval).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                from: EndpointState::Connecting,
                to: EndpointState::PendingRemoval,
                ..
            }
        ));
        assert_eq!(e.state(), EndpointState::Connecting);
    }
}
