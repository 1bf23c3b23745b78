//! Privilege resolution and admin-secret handling.
//!
//! The resolver issues at most one privilege check per instance. Callers that
//! arrive while the check is in flight wait on the access-state cell instead
//! of polling or issuing their own request.

use crate::error::{AccessError, Result};
use crate::types::AccessState;
use bridge_traits::FileServer;
use core_runtime::events::{AccessEvent, CoreEvent, EventBus};
use core_runtime::state::{cell, StateReader, StateWriter};
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Resolves whether this client is privileged and holds the admin secret.
///
/// Cloning is cheap; clones share one access state and one held secret.
///
/// # Example
///
/// ```ignore
/// let resolver = AccessResolver::new(server, writers.is_privileged, bus);
/// if resolver.wait_resolved().await {
///     // implicitly privileged
/// } else if resolver.unlock("hunter2").await? {
///     // secret held for later privileged calls
/// }
/// ```
#[derive(Clone)]
pub struct AccessResolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    server: Arc<dyn FileServer>,
    state: StateWriter<AccessState>,
    is_privileged: StateWriter<bool>,
    secret: RwLock<Option<String>>,
    event_bus: EventBus,
}

impl AccessResolver {
    /// Create a resolver in the `Unknown` state.
    ///
    /// `is_privileged` is the shared observable flag; it is written exactly
    /// once, when the check resolves.
    pub fn new(
        server: Arc<dyn FileServer>,
        is_privileged: StateWriter<bool>,
        event_bus: EventBus,
    ) -> Self {
        let (state, _) = cell(AccessState::Unknown);
        Self {
            inner: Arc::new(ResolverInner {
                server,
                state,
                is_privileged,
                secret: RwLock::new(None),
                event_bus,
            }),
        }
    }

    /// Start the privilege check unless it has already been started.
    ///
    /// Returns immediately. Only the first call moves `Unknown -> Pending`
    /// and issues the request; every later call is a no-op.
    pub fn resolve(&self) {
        let started = self.inner.state.modify(|state| {
            if *state == AccessState::Unknown {
                *state = AccessState::Pending;
                true
            } else {
                false
            }
        });
        if !started {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                handle.spawn(async move { inner.run_check().await });
            }
            Err(err) => {
                error!(error = %err, "No async runtime available for the privilege check");
                self.inner
                    .fail_check(AccessError::CheckFailed(err.to_string()));
            }
        }
    }

    /// Resolve (if needed) and wait for the terminal state.
    ///
    /// Returns `true` when access was granted.
    pub async fn wait_resolved(&self) -> bool {
        self.resolve();
        self.watch()
            .wait_for(|state| state.is_resolved())
            .await
            .map(|state| state.is_granted())
            .unwrap_or(false)
    }

    pub fn state(&self) -> AccessState {
        self.inner.state.get()
    }

    /// `true` only once access resolved as granted.
    pub fn is_granted(&self) -> bool {
        self.state().is_granted()
    }

    /// Observe access-state transitions.
    pub fn watch(&self) -> StateReader<AccessState> {
        self.inner.state.reader()
    }

    /// Verify a secret with the server.
    ///
    /// An absent or empty secret is never valid and is rejected without a
    /// network call.
    #[instrument(skip(self, secret), fields(present = secret.map_or(false, |s| !s.is_empty())))]
    pub async fn verify_secret(&self, secret: Option<&str>) -> Result<bool> {
        let secret = match secret {
            Some(secret) if !secret.is_empty() => secret,
            _ => return Ok(false),
        };
        let valid = self.inner.server.verify_secret(secret).await?;
        debug!(valid, "Secret verified");
        Ok(valid)
    }

    /// Verify the currently held secret, if any.
    pub async fn verify_held_secret(&self) -> Result<bool> {
        let secret = self.secret();
        self.verify_secret(secret.as_deref()).await
    }

    /// Exchange a password for the admin secret.
    ///
    /// On success the secret is held for later privileged calls and `true`
    /// is returned. A rejected password leaves any held secret untouched.
    #[instrument(skip(self, password))]
    pub async fn unlock(&self, password: &str) -> Result<bool> {
        let secret = self.inner.server.fetch_secret(password).await?;
        let accepted = secret.is_some();
        if let Some(secret) = secret {
            self.set_secret(secret);
            info!("Admin secret obtained");
        } else {
            info!("Password rejected");
        }
        self.inner.emit(AccessEvent::Unlocked { accepted });
        Ok(accepted)
    }

    /// Whether privileged operations may proceed: implicit privilege or a
    /// held secret the server still accepts.
    pub async fn can_modify(&self) -> Result<bool> {
        if self.is_granted() {
            return Ok(true);
        }
        self.verify_held_secret().await
    }

    /// Currently held secret.
    pub fn secret(&self) -> Option<String> {
        match self.inner.secret.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_secret(&self, secret: impl Into<String>) {
        let secret = secret.into();
        self.replace_secret(if secret.is_empty() { None } else { Some(secret) });
    }

    pub fn clear_secret(&self) {
        self.replace_secret(None);
    }

    fn replace_secret(&self, value: Option<String>) {
        match self.inner.secret.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

impl ResolverInner {
    async fn run_check(&self) {
        self.emit(AccessEvent::Resolving);
        debug!("Checking privilege");

        match self.server.check_privilege().await {
            Ok(granted) => self.finish(granted),
            Err(err) => self.fail_check(AccessError::CheckFailed(err.to_string())),
        }
    }

    fn fail_check(&self, failure: AccessError) {
        warn!(error = %failure, "Privilege check failed, treating as denied");
        self.emit(AccessEvent::CheckFailed {
            message: failure.to_string(),
        });
        self.finish(false);
    }

    fn finish(&self, granted: bool) {
        let resolved = if granted {
            AccessState::Granted
        } else {
            AccessState::Denied
        };
        self.is_privileged.set(granted);
        self.state.set(resolved);
        info!(state = %resolved, "Access resolved");
        self.emit(AccessEvent::Resolved { granted });
    }

    fn emit(&self, event: AccessEvent) {
        // No subscribers is fine.
        let _ = self.event_bus.emit(CoreEvent::Access(event));
    }
}

impl fmt::Debug for AccessResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessResolver")
            .field("state", &self.state())
            .field("has_secret", &self.secret().is_some())
            .finish()
    }
}
