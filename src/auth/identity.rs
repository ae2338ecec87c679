use futures::future::BoxFuture;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dao::{
    match_store::StoreSlot,
    models::{UserEntity, UserId},
    storage::StorageError,
};

/// Resolved identity of a connected user, immutable for the connection's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    /// User identifier.
    pub id: UserId,
    /// Display name shown to other participants.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Sport preference, when the user chose one.
    pub sport: Option<String>,
}

impl From<UserEntity> for Actor {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            sport: user.sport,
        }
    }
}

/// Reasons a bearer credential could not be resolved to an [`Actor`].
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No credential was presented.
    #[error("missing credential")]
    MissingCredential,
    /// Signature, expiry or claim validation failed.
    #[error("invalid credential")]
    InvalidCredential(#[source] jsonwebtoken::errors::Error),
    /// Credential names a user that does not exist.
    #[error("unknown user `{0}`")]
    UnknownUser(UserId),
    /// No user store is installed.
    #[error("user store unavailable")]
    StoreUnavailable,
    /// User lookup failed.
    #[error("user lookup failed")]
    Lookup(#[source] StorageError),
}

/// Validates a bearer credential and resolves the user behind it.
pub trait IdentityVerifier: Send + Sync {
    /// Resolve `credential` to an actor or reject it.
    fn verify(&self, credential: String) -> BoxFuture<'static, Result<Actor, IdentityError>>;
}

/// Claims carried by the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// User the token was issued for.
    #[serde(rename = "userId", alias = "sub")]
    pub user_id: UserId,
    /// Expiry as seconds since the epoch.
    pub exp: u64,
}

/// HS256 JSON Web Token verifier resolving users through the installed store.
#[derive(Clone)]
pub struct JwtIdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    users: StoreSlot,
}

impl JwtIdentityVerifier {
    /// Build a verifier for tokens signed with `secret`.
    pub fn new(secret: &[u8], users: StoreSlot) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            users,
        }
    }

    fn decode_claims(&self, credential: &str) -> Result<CredentialClaims, IdentityError> {
        decode::<CredentialClaims>(credential, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(IdentityError::InvalidCredential)
    }
}

impl IdentityVerifier for JwtIdentityVerifier {
    fn verify(&self, credential: String) -> BoxFuture<'static, Result<Actor, IdentityError>> {
        let verifier = self.clone();
        Box::pin(async move {
            if credential.trim().is_empty() {
                return Err(IdentityError::MissingCredential);
            }

            let claims = verifier.decode_claims(credential.trim())?;
            let store = verifier
                .users
                .current()
                .await
                .ok_or(IdentityError::StoreUnavailable)?;
            let user = store
                .find_user(claims.user_id.clone())
                .await
                .map_err(IdentityError::Lookup)?
                .ok_or(IdentityError::UnknownUser(claims.user_id))?;

            Ok(Actor::from(user))
        })
    }
}
