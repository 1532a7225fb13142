//! services/client/src/app/gate.rs
//!
//! The authentication gate. Owns the logged-in/logged-out decision,
//! validates the persisted credential against the backend at startup and
//! whenever a sibling context changes it, and fails closed on every
//! doubtful outcome: a questionable credential is cleared, never kept.

use std::sync::Arc;

use campus_assistant_core::domain::{SessionStatus, UserRecord};
use campus_assistant_core::ports::{
    BackendService, PortResult, PreferenceStore, KEY_AUTH_TOKEN,
};
use tracing::{info, warn};

/// The session gate state machine.
///
/// States: `Unauthenticated`, `Validating`, `Authenticated(user)`. The
/// gate starts in `Validating` and settles once [`SessionGate::initialize`]
/// has inspected the persisted credential. A single validation failure is
/// terminal for that attempt; there are no retries.
pub struct SessionGate {
    backend: Arc<dyn BackendService>,
    store: Arc<dyn PreferenceStore>,
    status: SessionStatus,
}

impl SessionGate {
    pub fn new(backend: Arc<dyn BackendService>, store: Arc<dyn PreferenceStore>) -> Self {
        Self {
            backend,
            store,
            status: SessionStatus::Validating,
        }
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Reads the persisted credential and validates it with the who-am-I
    /// endpoint.
    ///
    /// An absent credential settles to `Unauthenticated` without a backend
    /// call. A present credential whose identity comes back null or with
    /// zero observable fields is invalid: the credential is cleared and
    /// the gate settles to `Unauthenticated`. Transport and parse failures
    /// take the same path.
    pub async fn initialize(&mut self) {
        let credential = match self.store.get(KEY_AUTH_TOKEN) {
            Ok(credential) => credential,
            Err(e) => {
                warn!("Failed to read persisted credential: {e}");
                None
            }
        };

        if credential.is_none() {
            self.status = SessionStatus::Unauthenticated;
            return;
        }

        self.status = SessionStatus::Validating;
        match self.backend.who_am_i().await {
            Ok(identity) => match UserRecord::from_identity(&identity) {
                Some(user) => {
                    info!("Credential validated for {:?}.", user.email);
                    self.status = SessionStatus::Authenticated(user);
                }
                None => {
                    warn!("Who-am-I returned an empty identity; clearing credential.");
                    self.clear_credential();
                    self.status = SessionStatus::Unauthenticated;
                }
            },
            Err(e) => {
                warn!("Credential validation failed ({e}); clearing credential.");
                self.clear_credential();
                self.status = SessionStatus::Unauthenticated;
            }
        }
    }

    /// Re-runs the validation path after a sibling execution context
    /// changed or cleared the persisted credential. This closes the gap
    /// where one context logs out but another keeps rendering an
    /// authenticated view.
    pub async fn on_external_credential_change(&mut self) {
        info!("Persisted credential changed externally; revalidating.");
        self.initialize().await;
    }

    /// Exchanges credentials for a token, persists it, and revalidates.
    ///
    /// A response without a token (or any transport failure) propagates as
    /// an error and changes no local state.
    pub async fn login(&mut self, email: &str, password: &str) -> PortResult<()> {
        let grant = self.backend.login(email, password).await?;
        self.store.set(KEY_AUTH_TOKEN, &grant.token)?;
        self.initialize().await;
        Ok(())
    }

    /// Creates an account, then follows the same token-then-revalidate
    /// path as `login`.
    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> PortResult<()> {
        let grant = self.backend.register(name, email, password).await?;
        self.store.set(KEY_AUTH_TOKEN, &grant.token)?;
        self.initialize().await;
        Ok(())
    }

    /// Logs out locally, telling the backend on a best-effort basis.
    /// A failed backend call never blocks the local logout.
    pub async fn logout(&mut self) {
        if let Err(e) = self.backend.logout().await {
            warn!("Backend logout failed ({e}); clearing local session anyway.");
        }
        self.clear_credential();
        self.status = SessionStatus::Unauthenticated;
    }

    fn clear_credential(&mut self) {
        if let Err(e) = self.store.remove(KEY_AUTH_TOKEN) {
            warn!("Failed to clear persisted credential: {e}");
        }
    }
}

//=========================================================================================
// Tests
//=========================================================================================
