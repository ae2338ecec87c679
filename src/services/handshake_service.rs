use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    auth::{Actor, IdentityError},
    error::ServiceError,
    state::{
        AppState,
        connection::{ConnectionEvent, ConnectionPhase},
    },
};

/// Outcome of a successful handshake.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    /// Resolved actor, fixed for the connection's lifetime.
    pub actor: Actor,
    /// Always [`ConnectionPhase::Authenticated`].
    pub phase: ConnectionPhase,
}

/// Verify the bearer credential carried by the upgrade request.
///
/// Every credential problem collapses into `AuthenticationFailed`; only a
/// missing or failing user store is reported as unavailable.
pub async fn authenticate(
    state: &AppState,
    credential: Option<String>,
) -> Result<AuthenticatedSession, ServiceError> {
    let phase = ConnectionPhase::Connecting;

    let Some(credential) = credential.filter(|value| !value.trim().is_empty()) else {
        advance(phase, ConnectionEvent::Rejected)?;
        warn!("handshake rejected: missing credential");
        return Err(ServiceError::AuthenticationFailed);
    };
    let phase = advance(phase, ConnectionEvent::CredentialPresented)?;
    debug!(?phase, "verifying credential");

    let limit = state.config().storage_timeout();
    let verified = match timeout(limit, state.identity().verify(credential)).await {
        Ok(result) => result,
        Err(_) => {
            advance(phase, ConnectionEvent::Rejected)?;
            warn!("handshake rejected: identity verification timed out");
            return Err(ServiceError::Timeout);
        }
    };

    match verified {
        Ok(actor) => {
            let phase = advance(phase, ConnectionEvent::Verified)?;
            info!(user_id = %actor.id, "handshake authenticated");
            Ok(AuthenticatedSession { actor, phase })
        }
        Err(err) => {
            advance(phase, ConnectionEvent::Rejected)?;
            warn!(error = %err, "handshake rejected");
            Err(match err {
                IdentityError::StoreUnavailable => ServiceError::Degraded,
                IdentityError::Lookup(source) => ServiceError::Unavailable(source),
                IdentityError::MissingCredential
                | IdentityError::InvalidCredential(_)
                | IdentityError::UnknownUser(_) => ServiceError::AuthenticationFailed,
            })
        }
    }
}

fn advance(phase: ConnectionPhase, event: ConnectionEvent) -> Result<ConnectionPhase, ServiceError> {
    phase.on(event).map_err(|err| {
        warn!(error = %err, "illegal handshake transition");
        ServiceError::AuthenticationFailed
    })
}
