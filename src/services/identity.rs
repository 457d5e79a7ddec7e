//! Identity backend.
//!
//! [`IdentityProvider`] covers sign-up, sign-in, sign-out, password reset,
//! the current session, and a subscription to auth-state changes.
//! [`GoTrueClient`] implements it against a GoTrue-compatible `/auth/v1` API
//! and publishes an [`AuthEvent`] after every state change it makes.

use crate::config::env::BackendCredentials;
use crate::config::settings::IdentitySettings;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

const EVENT_CAPACITY: usize = 16;

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Opaque identity id
    pub id: String,
    /// Email, when the backend returns it
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens plus the user they belong to.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AuthSession {
    /// Bearer token for authenticated requests
    pub access_token: String,
    /// Token used to renew the session
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Identity owning the session
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"<redacted>")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Result of a sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    /// Account created and signed in immediately
    Session(AuthSession),
    /// Account created; email confirmation pending
    PendingConfirmation(AuthUser),
}

impl SignUpOutcome {
    /// The created identity
    #[must_use]
    pub const fn user(&self) -> &AuthUser {
        match self {
            Self::Session(session) => &session.user,
            Self::PendingConfirmation(user) => user,
        }
    }
}

/// Auth-state change published by an identity backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A user signed in (or a session was restored)
    SignedIn(AuthUser),
    /// The session ended
    SignedOut,
    /// Tokens were renewed for the same user ([`GoTrueClient::refresh_session`])
    TokenRefreshed(AuthUser),
    /// Profile attributes of the user changed. [`GoTrueClient`] never edits
    /// profiles, so it does not publish this; other providers may.
    UserUpdated(AuthUser),
}

/// Identity backend as seen by the session layer.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Creates an account.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<SignUpOutcome>> + Send;

    /// Signs in with email and password.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthSession>> + Send;

    /// Ends the current session.
    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;

    /// Sends a password reset email.
    fn reset_password(&self, email: &str) -> impl Future<Output = Result<()>> + Send;

    /// Session held by the backend client, if any.
    fn current_session(&self) -> Option<AuthSession>;

    /// Subscribes to auth-state changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for a GoTrue-compatible identity API.
#[derive(Debug)]
pub struct GoTrueClient {
    http: reqwest::Client,
    credentials: Option<BackendCredentials>,
    session: Mutex<Option<AuthSession>>,
    events: broadcast::Sender<AuthEvent>,
}

impl GoTrueClient {
    /// Creates a client with the request timeout from `settings`.
    ///
    /// Without credentials every call fails with [`Error::Config`].
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend init).
    pub fn new(
        credentials: Option<BackendCredentials>,
        settings: &IdentitySettings,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            http,
            credentials,
            session: Mutex::new(None),
            events,
        })
    }

    /// Exchanges the held refresh token for a new session.
    ///
    /// Publishes [`AuthEvent::TokenRefreshed`] on success.
    ///
    /// # Errors
    /// Returns [`Error::Auth`] if no session with a refresh token is held, or the
    /// backend's error if the exchange fails.
    #[instrument(skip(self))]
    pub async fn refresh_session(&self) -> Result<AuthSession> {
        let refresh_token = self
            .current_session()
            .and_then(|s| s.refresh_token)
            .ok_or_else(|| Error::Auth {
                message: "no session to refresh".to_string(),
            })?;
        let response = self
            .post(
                "token?grant_type=refresh_token",
                &RefreshRequest {
                    refresh_token: &refresh_token,
                },
                None,
            )
            .await?;
        let session: AuthSession = response.json().await?;
        self.store_session(Some(session.clone()));
        self.publish(AuthEvent::TokenRefreshed(session.user.clone()));
        Ok(session)
    }

    fn credentials(&self) -> Result<&BackendCredentials> {
        self.credentials.as_ref().ok_or_else(|| Error::Config {
            message: "identity backend is not configured".to_string(),
        })
    }

    fn endpoint(credentials: &BackendCredentials, path: &str) -> String {
        format!("{}/auth/v1/{path}", credentials.url.trim_end_matches('/'))
    }

    fn store_session(&self, session: Option<AuthSession>) {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn publish(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response> {
        let credentials = self.credentials()?;
        let response = self
            .http
            .post(Self::endpoint(credentials, path))
            .header("apikey", &credentials.key)
            .bearer_auth(bearer.unwrap_or(&credentials.key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .msg
            .or(body.error_description)
            .or(body.message)
            .unwrap_or_else(|| status.to_string());
        Err(Error::Auth { message })
    }
}

impl IdentityProvider for GoTrueClient {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let response = self
            .post("signup", &Credentials { email, password }, None)
            .await?;
        let outcome: SignUpOutcome = response.json().await?;
        if let SignUpOutcome::Session(session) = &outcome {
            self.store_session(Some(session.clone()));
            self.publish(AuthEvent::SignedIn(session.user.clone()));
        }
        info!(user_id = %outcome.user().id, "Account created");
        Ok(outcome)
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .post("token?grant_type=password", &Credentials { email, password }, None)
            .await?;
        let session: AuthSession = response.json().await?;
        self.store_session(Some(session.clone()));
        self.publish(AuthEvent::SignedIn(session.user.clone()));
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<()> {
        let token = self.current_session().map(|s| s.access_token);
        if let Some(token) = token {
            if let Err(e) = self.post("logout", &serde_json::json!({}), Some(&token)).await {
                // The local session is dropped regardless; the server token expires on its own
                warn!("Remote sign-out failed: {e}");
            }
        }
        self.store_session(None);
        self.publish(AuthEvent::SignedOut);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reset_password(&self, email: &str) -> Result<()> {
        self.post("recover", &RecoverRequest { email }, None).await?;
        Ok(())
    }

    fn current_session(&self) -> Option<AuthSession> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
