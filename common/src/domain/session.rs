//! Admin authentication: the session gate and its credential verifier.
//!
//! ```text
//! LoggedOut -> Authenticating -> LoggedIn(role)
//!                             -> AccessDenied -> LoggedOut (after 3 s)
//! LoggedOut -> Trapped (terminal)
//! ```
//!
//! The login form carries a decoy "username" field that a legitimate operator
//! always leaves blank. Any non-blank decoy traps the gate before the
//! credential verifier is consulted.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::clock::Clock;

/// How long a denial stays on screen before the form resets.
pub const DENIAL_DISPLAY_SECS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Elevated,
    Restricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(Uuid);

impl SessionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for SessionToken {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: SessionToken,
    pub role: Role,
    pub established_at: DateTime<Utc>,
}

/// A submitted credential. Never printed.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    /// Decoy field. Must stay blank.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub secret: Secret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    AccessDenied,
    /// Transport or backend failure. Treated as a denial by every caller.
    Unavailable(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::AccessDenied => f.write_str("access denied"),
            AuthError::Unavailable(cause) => write!(f, "credential verifier unavailable: {cause}"),
        }
    }
}

impl std::error::Error for AuthError {}

pub trait CredentialVerifier: Send + Sync + 'static {
    /// Resolve the role a secret grants.
    fn verify(&self, secret: &Secret) -> impl Future<Output = Result<Role, AuthError>> + Send;

    /// Previously established session, for restoring after a reload.
    fn current_session(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Option<Session>> + Send;

    fn remember_session(&self, session: Session) -> impl Future<Output = ()> + Send;

    fn clear_session(&self, token: &SessionToken) -> impl Future<Output = ()> + Send;
}

/// True when the decoy field was filled in.
pub fn is_intrusion(decoy: &str) -> bool {
    !decoy.trim().is_empty()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    LoggedOut,
    Authenticating,
    LoggedIn(Role),
    AccessDenied,
    Trapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    /// Generic denial; never says which part of the credential was wrong.
    AccessDenied,
    IntrusionDetected,
}

#[derive(Debug)]
pub struct SessionGate {
    state: GateState,
    denied_until: Option<DateTime<Utc>>,
    session: Option<Session>,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub fn new() -> Self {
        Self {
            state: GateState::LoggedOut,
            denied_until: None,
            session: None,
        }
    }

    /// Rebuild a gate from a session the verifier still knows about.
    pub async fn restore<V: CredentialVerifier>(token: &SessionToken, verifier: &V) -> Self {
        let mut gate = Self::new();
        if let Some(session) = verifier.current_session(token).await {
            gate.state = GateState::LoggedIn(session.role);
            gate.session = Some(session);
        }
        gate
    }

    /// Visible state at `now`; a denial reads as `LoggedOut` once its display
    /// window has passed.
    pub fn state(&self, now: DateTime<Utc>) -> GateState {
        match (self.state, self.denied_until) {
            (GateState::AccessDenied, Some(until)) if now >= until => GateState::LoggedOut,
            (state, _) => state,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn denied_until(&self) -> Option<DateTime<Utc>> {
        self.denied_until
    }

    pub async fn submit<V: CredentialVerifier>(
        &mut self,
        form: &LoginForm,
        verifier: &V,
        clock: &impl Clock,
    ) -> Result<Role, GateRejection> {
        if self.state == GateState::Trapped {
            return Err(GateRejection::IntrusionDetected);
        }
        if is_intrusion(&form.username) {
            tracing::warn!("login decoy field filled in, gate trapped");
            self.state = GateState::Trapped;
            self.denied_until = None;
            self.session = None;
            return Err(GateRejection::IntrusionDetected);
        }

        self.state = GateState::Authenticating;
        match verifier.verify(&form.secret).await {
            Ok(role) => {
                let session = Session {
                    token: SessionToken::generate(),
                    role,
                    established_at: clock.now(),
                };
                verifier.remember_session(session.clone()).await;
                tracing::info!(?role, "admin session established");
                self.state = GateState::LoggedIn(role);
                self.denied_until = None;
                self.session = Some(session);
                Ok(role)
            }
            Err(err) => {
                if let AuthError::Unavailable(cause) = &err {
                    tracing::error!(%cause, "credential verification failed, denying access");
                } else {
                    tracing::info!("admin login denied");
                }
                self.state = GateState::AccessDenied;
                self.denied_until = Some(clock.now() + TimeDelta::seconds(DENIAL_DISPLAY_SECS));
                self.session = None;
                Err(GateRejection::AccessDenied)
            }
        }
    }

    /// Step-up check inside the admin area. Leaves the current session as is.
    pub async fn verify_current<V: CredentialVerifier>(
        &self,
        secret: &Secret,
        verifier: &V,
    ) -> Result<Role, AuthError> {
        verifier.verify(secret).await.map_err(|err| {
            if let AuthError::Unavailable(cause) = &err {
                tracing::error!(%cause, "step-up verification failed, denying");
            }
            AuthError::AccessDenied
        })
    }

    pub async fn logout<V: CredentialVerifier>(&mut self, verifier: &V) {
        if let Some(session) = self.session.take() {
            verifier.clear_session(&session.token).await;
        }
        if self.state != GateState::Trapped {
            self.state = GateState::LoggedOut;
        }
        self.denied_until = None;
    }
}
