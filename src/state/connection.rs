use thiserror::Error;

/// Lifecycle phase of a real-time connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// Transport established, nothing verified yet.
    #[default]
    Connecting,
    /// Credential handed to the identity verifier.
    Authenticating,
    /// Actor resolved; the connection may be registered.
    Authenticated,
    /// Terminal phase, reached on rejection or disconnect.
    Closed,
}

/// Inputs driving [`ConnectionPhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A bearer credential was presented.
    CredentialPresented,
    /// The identity verifier accepted the credential.
    Verified,
    /// Credential missing, invalid or bound to an unknown user.
    Rejected,
    /// Transport closed by either side.
    Disconnected,
}

/// Event not accepted in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event {event:?} not allowed in phase {phase:?}")]
pub struct InvalidPhaseTransition {
    /// Phase the connection was in.
    pub phase: ConnectionPhase,
    /// Rejected event.
    pub event: ConnectionEvent,
}

impl ConnectionPhase {
    /// Next phase after `event`, or an error for an illegal transition.
    pub fn on(self, event: ConnectionEvent) -> Result<ConnectionPhase, InvalidPhaseTransition> {
        use ConnectionEvent::*;
        use ConnectionPhase::*;

        match (self, event) {
            (Connecting, CredentialPresented) => Ok(Authenticating),
            (Connecting, Rejected) => Ok(Closed),
            (Authenticating, Verified) => Ok(Authenticated),
            (Authenticating, Rejected) => Ok(Closed),
            (Connecting | Authenticating | Authenticated, Disconnected) => Ok(Closed),
            (phase, event) => Err(InvalidPhaseTransition { phase, event }),
        }
    }

    /// Whether requests may be served in this phase.
    pub fn is_authenticated(self) -> bool {
        self == ConnectionPhase::Authenticated
    }
}
