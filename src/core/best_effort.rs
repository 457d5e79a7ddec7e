//! Best-effort side effects and the degradation hook.
//!
//! [`Observer`] is where absorbed failures go: each one is logged at `warn`
//! with a `degraded` field and handed to an optional hook (metrics, tests).
//! [`BestEffort`] runs a fallible future on the runtime without making the
//! caller wait for it; if it fails, the failure goes to the observer and
//! nowhere else.

use crate::errors::{Degradation, Error, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

type Hook = Arc<dyn Fn(Degradation, &Error) + Send + Sync>;

/// Receives every failure that was degraded to a default.
#[derive(Clone, Default)]
pub struct Observer {
    hook: Option<Hook>,
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl Observer {
    /// An observer that only logs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An observer that logs and then calls `hook`.
    #[must_use]
    pub fn with_hook<F>(hook: F) -> Self
    where
        F: Fn(Degradation, &Error) + Send + Sync + 'static,
    {
        Self {
            hook: Some(Arc::new(hook)),
        }
    }

    /// Records one absorbed failure.
    pub fn report(&self, kind: Degradation, error: &Error) {
        warn!(degraded = kind.as_str(), "Degraded to default: {error}");
        if let Some(hook) = &self.hook {
            hook(kind, error);
        }
    }
}

/// Handle to a dispatched side effect.
///
/// Dropping it does not cancel the effect. Awaiting [`EffectHandle::settled`]
/// waits for the attempt to finish, which is what tests rely on.
#[derive(Debug)]
pub struct EffectHandle(JoinHandle<bool>);

impl EffectHandle {
    /// Waits for the attempt and reports whether it succeeded.
    pub async fn settled(self) -> bool {
        self.0.await.unwrap_or(false)
    }
}

/// Dispatches fire-and-forget work whose failures are observed, never returned.
#[derive(Debug, Clone, Default)]
pub struct BestEffort {
    observer: Observer,
}

impl BestEffort {
    /// Creates a dispatcher reporting to `observer`.
    #[must_use]
    pub const fn new(observer: Observer) -> Self {
        Self { observer }
    }

    /// Spawns `effect`; a failure is reported as `kind`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, kind: Degradation, effect: F) -> EffectHandle
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let observer = self.observer.clone();
        EffectHandle(tokio::spawn(async move {
            match effect.await {
                Ok(()) => true,
                Err(e) => {
                    observer.report(kind, &e);
                    false
                }
            }
        }))
    }
}
