//! Session tracking - Who is signed in, and with which role.
//!
//! A [`Session`] is constructed explicitly with [`Session::start`] and torn
//! down with [`Session::shutdown`] (or by dropping it). While alive it listens
//! to the identity provider's auth events:
//!
//! ```text
//! Unauthenticated -> Authenticating(user) -> Authenticated { user, role }
//!        ^                                              |
//!        +------------------- sign-out -----------------+
//! ```
//!
//! The role is resolved once per authentication (sign-in, restored session,
//! or a sign-in seen on the event stream) and cached until the next one.
//! Identity and role live in one [`SessionState`] value, so sign-out replaces
//! both in a single write.
//!
//! Every authentication takes an epoch number. A role lookup only lands if no
//! newer authentication or sign-out happened while it was running.

use crate::{
    core::{
        merchant::{MerchantProfile, create_merchant, validated_name},
        role::{Role, resolve_role},
    },
    errors::{Error, Result},
    services::identity::{AuthEvent, AuthUser, IdentityProvider, SignUpOutcome},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Authentication state of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Nobody signed in
    #[default]
    Unauthenticated,
    /// Signed in; role lookup running
    Authenticating(AuthUser),
    /// Signed in with a resolved role
    Authenticated {
        /// The signed-in identity
        user: AuthUser,
        /// Role cached for this authentication
        role: Role,
    },
}

impl SessionState {
    /// The signed-in identity, if any
    #[must_use]
    pub const fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::Unauthenticated => None,
            Self::Authenticating(user) | Self::Authenticated { user, .. } => Some(user),
        }
    }

    /// The resolved role, once authentication has finished
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        match self {
            Self::Authenticated { role, .. } => Some(*role),
            Self::Unauthenticated | Self::Authenticating(_) => None,
        }
    }

    fn holds(&self, user: &AuthUser) -> bool {
        self.user().is_some_and(|held| held.id == user.id)
    }
}

/// Kind of account created at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountType {
    /// Plain searching user
    User,
    /// Merchant with a storefront profile
    Merchant(MerchantProfile),
}

#[derive(Debug)]
struct SessionCore {
    db: DatabaseConnection,
    state: watch::Sender<SessionState>,
    epoch: AtomicU64,
}

impl SessionCore {
    /// Enters `Authenticating(user)` and returns the new epoch.
    ///
    /// With `only_if_new`, nothing happens (and `None` is returned) when the
    /// session already holds this user.
    fn begin(&self, user: &AuthUser, only_if_new: bool) -> Option<u64> {
        let mut epoch = None;
        self.state.send_if_modified(|state| {
            if only_if_new && state.holds(user) {
                return false;
            }
            epoch = Some(self.epoch.fetch_add(1, Ordering::SeqCst) + 1);
            *state = SessionState::Authenticating(user.clone());
            true
        });
        epoch
    }

    /// Resolves the role for `user`; returns it if this authentication is still current.
    async fn authenticate(&self, user: AuthUser, only_if_new: bool) -> Option<Role> {
        let epoch = self.begin(&user, only_if_new)?;
        let role = resolve_role(&self.db, &user.id).await;

        let landed = self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            *state = SessionState::Authenticated { user, role };
            true
        });
        if landed {
            info!(role = role.as_str(), "Session authenticated");
            Some(role)
        } else {
            debug!("Superseded role lookup discarded");
            None
        }
    }

    fn clear(&self) {
        self.state.send_modify(|state| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *state = SessionState::Unauthenticated;
        });
    }
}

async fn listen<P: IdentityProvider>(
    core: Arc<SessionCore>,
    provider: Arc<P>,
    mut events: broadcast::Receiver<AuthEvent>,
) {
    loop {
        match events.recv().await {
            Ok(AuthEvent::SignedOut) => core.clear(),
            Ok(
                AuthEvent::SignedIn(user)
                | AuthEvent::TokenRefreshed(user)
                | AuthEvent::UserUpdated(user),
            ) => {
                // Events can trail a later sign-out; trust the provider's current session
                let current = provider
                    .current_session()
                    .is_some_and(|session| session.user.id == user.id);
                if !current {
                    debug!(user_id = %user.id, "Ignoring stale auth event");
                    continue;
                }
                core.authenticate(user, true).await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Auth event stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// An explicitly constructed session bound to one identity provider.
#[derive(Debug)]
pub struct Session<P> {
    provider: Arc<P>,
    core: Arc<SessionCore>,
    listener: JoinHandle<()>,
}

impl<P: IdentityProvider> Session<P> {
    /// Subscribes to auth events and restores the provider's current session, if any.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(provider: Arc<P>, db: DatabaseConnection) -> Self {
        let events = provider.subscribe();
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        let core = Arc::new(SessionCore {
            db,
            state,
            epoch: AtomicU64::new(0),
        });
        let listener = tokio::spawn(listen(Arc::clone(&core), Arc::clone(&provider), events));

        if let Some(session) = provider.current_session() {
            core.authenticate(session.user, false).await;
        }
        Self {
            provider,
            core,
            listener,
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.core.state.borrow().clone()
    }

    /// Receiver that sees every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.core.state.subscribe()
    }

    /// Cached role, once authenticated.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.core.state.borrow().role()
    }

    /// Signs in and resolves the role.
    ///
    /// # Errors
    /// Returns the provider's error, or [`Error::Auth`] if the session was
    /// signed out or switched user while the role was being resolved.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Role> {
        let session = self.provider.sign_in(email, password).await?;
        self.core
            .authenticate(session.user, false)
            .await
            .ok_or_else(|| Error::Auth {
                message: "session changed during sign-in".to_string(),
            })
    }

    /// Creates an account; merchant accounts also get a merchant profile.
    ///
    /// The merchant profile email defaults to the account email. If the provider
    /// signs the new account in straight away, the session is authenticated
    /// after the profile exists, so the cached role is `Merchant`.
    ///
    /// # Errors
    /// Returns an error if:
    /// - A merchant account has a blank business name (checked before sign-up)
    /// - The provider rejects the sign-up
    /// - The merchant profile insert fails
    #[instrument(skip(self, password, account_type))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        account_type: AccountType,
    ) -> Result<SignUpOutcome> {
        if let AccountType::Merchant(profile) = &account_type {
            validated_name(profile)?;
        }

        let outcome = self.provider.sign_up(email, password).await?;

        if let AccountType::Merchant(mut profile) = account_type {
            if profile.email.as_deref().is_none_or(|e| e.trim().is_empty()) {
                profile.email = Some(email.to_string());
            }
            create_merchant(&self.core.db, &outcome.user().id, profile).await?;
        }

        if let SignUpOutcome::Session(session) = &outcome {
            self.core.authenticate(session.user.clone(), false).await;
        }
        Ok(outcome)
    }

    /// Signs out; identity and role are cleared together.
    ///
    /// # Errors
    /// Returns the provider's error; the session is left as it was.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        self.provider.sign_out().await?;
        self.core.clear();
        info!("Session signed out");
        Ok(())
    }

    /// Sends a password reset email.
    ///
    /// # Errors
    /// Returns the provider's error.
    pub async fn reset_password(&self, email: &str) -> Result<()> {
        self.provider.reset_password(email).await
    }

    /// Stops listening to auth events.
    pub fn shutdown(self) {
        self.listener.abort();
    }
}

impl<P> Drop for Session<P> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
