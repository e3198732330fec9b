//! Argon2-backed credential verifier with an in-process session table.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordVerifier};
use marquee_common::session::{AuthError, CredentialVerifier, Role, Secret, Session, SessionToken};

use crate::infrastructure::settings::AuthSettings;

#[derive(Clone)]
pub struct Argon2Verifier {
    elevated_hash: Arc<str>,
    restricted_hash: Option<Arc<str>>,
    sessions: Arc<RwLock<HashMap<SessionToken, Session>>>,
}

impl Argon2Verifier {
    pub fn new(settings: &AuthSettings) -> Self {
        Self {
            elevated_hash: Arc::from(settings.elevated_hash.as_str()),
            restricted_hash: settings.restricted_hash.as_deref().map(Arc::from),
            sessions: Arc::default(),
        }
    }
}

impl CredentialVerifier for Argon2Verifier {
    async fn verify(&self, secret: &Secret) -> Result<Role, AuthError> {
        let secret = secret.clone();
        let elevated = self.elevated_hash.clone();
        let restricted = self.restricted_hash.clone();

        // hashing is deliberately slow, keep it off the async workers
        tokio::task::spawn_blocking(move || {
            if matches_hash(&secret, &elevated)? {
                return Ok(Role::Elevated);
            }
            match restricted {
                Some(hash) if matches_hash(&secret, &hash)? => Ok(Role::Restricted),
                _ => Err(AuthError::AccessDenied),
            }
        })
        .await
        .map_err(|err| AuthError::Unavailable(err.to_string()))?
    }

    async fn current_session(&self, token: &SessionToken) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
    }

    async fn remember_session(&self, session: Session) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.token, session);
    }

    async fn clear_session(&self, token: &SessionToken) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
    }
}

fn matches_hash(secret: &Secret, phc: &str) -> Result<bool, AuthError> {
    let hash = PasswordHash::new(phc)
        .map_err(|err| AuthError::Unavailable(format!("malformed credential hash: {err}")))?;
    Ok(Argon2::default()
        .verify_password(secret.expose().as_bytes(), &hash)
        .is_ok())
}
