//! Shared test utilities for the coffee discovery crate.
//!
//! This module provides a fresh in-memory database, factories for catalog rows
//! with sensible defaults, and scripted stand-ins for the two external
//! backends (language model and identity).

use crate::{
    config::settings::LanguageModelSettings,
    core::{
        best_effort::{BestEffort, Observer},
        merchant::{MerchantProfile, create_merchant},
        preference::PreferenceExtractor,
        product::{ProductInput, create_product},
        role::Role,
        search::SearchOrchestrator,
    },
    entities::{
        merchant,
        product::{self, Acidity, RoastLevel},
    },
    errors::{Degradation, Error, Result},
    services::{
        identity::{AuthEvent, AuthSession, AuthUser, IdentityProvider, SignUpOutcome},
        llm::{CompletionBackend, CompletionRequest},
    },
};
use sea_orm::{ConnectOptions, DatabaseConnection};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Routes `tracing` output to the test harness; safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// The pool is pinned to one connection so spawned side effects see the same
/// in-memory database as the test body.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Product form input with only a name and price set.
pub fn product_input(name: &str, price: f64) -> ProductInput {
    ProductInput {
        name: name.to_string(),
        price,
        ..ProductInput::default()
    }
}

/// Creates a merchant named after its user, with a contact email.
pub async fn create_test_merchant(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<merchant::Model> {
    create_merchant(
        db,
        user_id,
        MerchantProfile {
            name: format!("Merchant {user_id}"),
            email: Some(format!("{user_id}@beans.test")),
            ..MerchantProfile::default()
        },
    )
    .await
}

/// Creates an admin-curated product with the attributes search filters on.
///
/// # Defaults
/// * price: 15.0
/// * featured: false
pub async fn create_catalog_product(
    db: &DatabaseConnection,
    name: &str,
    origin: &str,
    roast_level: RoastLevel,
    acidity: Acidity,
) -> Result<product::Model> {
    let input = ProductInput {
        origin: Some(origin.to_string()),
        roast_level: Some(roast_level),
        acidity: Some(acidity),
        ..product_input(name, 15.0)
    };
    create_product(db, &Role::Admin, input).await
}

#[derive(Debug)]
enum Script {
    Repeat(Result<String>),
    Queue(VecDeque<Result<String>>),
    Stall,
}

fn replay(reply: &Result<String>) -> Result<String> {
    match reply {
        Ok(text) => Ok(text.clone()),
        Err(e) => Err(Error::LanguageModel {
            message: e.to_string(),
        }),
    }
}

/// Language-model stand-in that replays canned replies and records requests.
#[derive(Debug)]
pub struct StubBackend {
    script: Mutex<Script>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubBackend {
    fn with_script(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answers every request with `reply`.
    pub fn replying(reply: &str) -> Arc<Self> {
        Self::with_script(Script::Repeat(Ok(reply.to_string())))
    }

    /// Fails every request.
    pub fn failing() -> Arc<Self> {
        Self::with_script(Script::Repeat(Err(Error::LanguageModel {
            message: "backend unavailable".to_string(),
        })))
    }

    /// Never answers.
    pub fn stalling() -> Arc<Self> {
        Self::with_script(Script::Stall)
    }

    /// Answers requests with `replies` in order, then fails.
    pub fn scripted(replies: Vec<Result<String>>) -> Arc<Self> {
        Self::with_script(Script::Queue(replies.into()))
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    fn next_reply(&self) -> Option<Result<String>> {
        match &mut *lock(&self.script) {
            Script::Repeat(reply) => Some(replay(reply)),
            Script::Queue(queue) => Some(queue.pop_front().unwrap_or_else(|| {
                Err(Error::LanguageModel {
                    message: "script exhausted".to_string(),
                })
            })),
            Script::Stall => None,
        }
    }
}

impl CompletionBackend for StubBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        lock(&self.requests).push(request);
        match self.next_reply() {
            Some(reply) => reply,
            None => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::Timeout {
                    operation: "stalled completion",
                })
            }
        }
    }
}

/// Collects degradation kinds seen by an observer.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Degradation>>>);

impl Recorder {
    /// Kinds reported so far, in order.
    pub fn kinds(&self) -> Vec<Degradation> {
        lock(&self.0).clone()
    }
}

/// An observer whose reports land in the returned [`Recorder`].
pub fn recording_observer() -> (Observer, Recorder) {
    let recorder = Recorder::default();
    let sink = recorder.clone();
    let observer = Observer::with_hook(move |kind, _| lock(&sink.0).push(kind));
    (observer, recorder)
}

/// Extractor over `backend` with default settings and a one second deadline.
pub fn test_extractor(
    backend: &Arc<StubBackend>,
    observer: Observer,
) -> PreferenceExtractor<StubBackend> {
    PreferenceExtractor::new(
        Arc::clone(backend),
        &LanguageModelSettings::default(),
        Duration::from_secs(1),
        observer,
    )
}

/// Orchestrator over `db` and `backend`; both extraction and logging report to `observer`.
pub fn test_orchestrator(
    db: &DatabaseConnection,
    backend: &Arc<StubBackend>,
    observer: Observer,
) -> SearchOrchestrator<StubBackend> {
    SearchOrchestrator::new(
        db.clone(),
        test_extractor(backend, observer.clone()),
        BestEffort::new(observer),
        Duration::from_secs(1),
    )
}

/// Identity-provider stand-in with in-memory accounts.
pub struct StubIdentity {
    accounts: Mutex<HashMap<String, (String, AuthUser)>>,
    session: Mutex<Option<AuthSession>>,
    events: broadcast::Sender<AuthEvent>,
    next_id: AtomicU64,
    confirm_email: bool,
    sign_out_fails: AtomicBool,
}

impl std::fmt::Debug for StubIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubIdentity").finish_non_exhaustive()
    }
}

impl StubIdentity {
    fn build(confirm_email: bool) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            accounts: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
            events,
            next_id: AtomicU64::new(1),
            confirm_email,
            sign_out_fails: AtomicBool::new(false),
        })
    }

    /// Sign-ups return a session immediately.
    pub fn new() -> Arc<Self> {
        Self::build(false)
    }

    /// Sign-ups wait for email confirmation.
    pub fn requiring_confirmation() -> Arc<Self> {
        Self::build(true)
    }

    /// Registers an account without signing in.
    pub fn add_account(&self, email: &str, password: &str) -> AuthUser {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let user = AuthUser {
            id: format!("user-{id}"),
            email: Some(email.to_string()),
        };
        lock(&self.accounts).insert(email.to_string(), (password.to_string(), user.clone()));
        user
    }

    /// Number of registered accounts.
    pub fn account_count(&self) -> usize {
        lock(&self.accounts).len()
    }

    /// Makes every later sign-out fail.
    pub fn fail_sign_out(&self) {
        self.sign_out_fails.store(true, Ordering::SeqCst);
    }

    /// Holds a session for `user` without publishing anything.
    pub fn restore(&self, user: &AuthUser) {
        *lock(&self.session) = Some(session_for(user));
    }

    /// Publishes `event` as if it came from the backend.
    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    /// A sign-in that happened elsewhere (another tab, a restored token).
    pub fn sign_in_externally(&self, user: &AuthUser) {
        self.restore(user);
        self.emit(AuthEvent::SignedIn(user.clone()));
    }

    /// A sign-out that happened elsewhere.
    pub fn sign_out_externally(&self) {
        *lock(&self.session) = None;
        self.emit(AuthEvent::SignedOut);
    }
}

fn session_for(user: &AuthUser) -> AuthSession {
    AuthSession {
        access_token: format!("token-{}", user.id),
        refresh_token: None,
        user: user.clone(),
    }
}

impl IdentityProvider for StubIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        if lock(&self.accounts).contains_key(email) {
            return Err(Error::Auth {
                message: "User already registered".to_string(),
            });
        }
        let user = self.add_account(email, password);
        if self.confirm_email {
            return Ok(SignUpOutcome::PendingConfirmation(user));
        }
        self.sign_in_externally(&user);
        Ok(SignUpOutcome::Session(session_for(&user)))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let user = lock(&self.accounts)
            .get(email)
            .filter(|(stored, _)| stored == password)
            .map(|(_, user)| user.clone())
            .ok_or_else(|| Error::Auth {
                message: "Invalid login credentials".to_string(),
            })?;
        self.sign_in_externally(&user);
        Ok(session_for(&user))
    }

    async fn sign_out(&self) -> Result<()> {
        if self.sign_out_fails.load(Ordering::SeqCst) {
            return Err(Error::Auth {
                message: "sign-out rejected".to_string(),
            });
        }
        self.sign_out_externally();
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<()> {
        if lock(&self.accounts).contains_key(email) {
            Ok(())
        } else {
            Err(Error::Auth {
                message: "User not found".to_string(),
            })
        }
    }

    fn current_session(&self) -> Option<AuthSession> {
        lock(&self.session).clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
