//! Session store: the authentication state machine.
//!
//! The store owns the `(token, user, loading)` triple and every transition
//! of it. Every network step is fail-closed: if sign-in succeeds but the
//! identity behind the new token cannot be resolved, the token is discarded
//! and the session returns to unauthenticated.
//!
//! State lives in a `watch` channel so observers (route gates, the shell)
//! see each transition, and every change is mirrored to persistent storage
//! under [`StorageKeys::SESSION`].

use crate::types::{AuthToken, RegisterRequest, Session, SessionPhase, SignInRequest, User};
use crate::{SessionError, SessionResult};
use pixelforge_http::{HttpClient, Unauthorized};
use pixelforge_storage::{KeyValueStorage, StorageKeys};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Authentication session for one composition root.
pub struct SessionStore {
    http: Arc<HttpClient>,
    storage: Arc<dyn KeyValueStorage>,
    state: watch::Sender<Session>,
}

impl SessionStore {
    /// Create the store, restoring whatever a previous run persisted.
    ///
    /// The token comes from the HTTP client. A persisted identity is only
    /// restored when it was saved alongside that same token.
    pub fn new(http: Arc<HttpClient>, storage: Arc<dyn KeyValueStorage>) -> Self {
        let session = restore_session(&http, storage.as_ref());
        debug!(
            has_token = session.token.is_some(),
            has_user = session.user.is_some(),
            "Session restored"
        );

        let (state, _) = watch::channel(session);
        Self {
            http,
            storage,
            state,
        }
    }

    /// Create the store and start tearing it down on every 401.
    ///
    /// This is the constructor composition roots use: the subscription is
    /// live before the store is handed out, independent of any route-level
    /// watcher. Must be called inside a tokio runtime.
    pub fn start(http: Arc<HttpClient>, storage: Arc<dyn KeyValueStorage>) -> Arc<Self> {
        let store = Arc::new(Self::new(http, storage));
        store.watch_unauthorized();
        store
    }

    /// The HTTP client this store authenticates.
    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }

    /// Current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Observe every session transition.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Subscribe to the HTTP client's unauthorized signal.
    pub fn subscribe_unauthorized(&self) -> broadcast::Receiver<Unauthorized> {
        self.http.subscribe_unauthorized()
    }

    /// Sign in with email and password, then resolve the identity.
    ///
    /// Any failure (credentials rejected or identity fetch failed) tears the
    /// session down before the error is returned. `loading` is cleared on
    /// every outcome.
    pub async fn login(&self, email: &str, password: &str) -> SessionResult<User> {
        info!(email = %email, "Signing in");
        let request = SignInRequest { email, password };
        self.authenticate("auth/signin", &request).await
    }

    /// Create an account, adopt the returned token and resolve the identity.
    ///
    /// Same fail-closed contract as [`SessionStore::login`].
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> SessionResult<User> {
        info!(email = %email, username = %username, "Registering");
        let request = RegisterRequest {
            email,
            password,
            username,
        };
        self.authenticate("auth/register", &request).await
    }

    /// Resolve the identity behind the held token.
    ///
    /// Returns `Ok(None)` without a request when no token is held. On
    /// failure the session is torn down and the error returned.
    pub async fn fetch_user(&self) -> SessionResult<Option<User>> {
        let Some(token) = self.token() else {
            debug!("No token held, skipping identity fetch");
            return Ok(None);
        };

        match self.resolve_identity(token).await {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "Identity fetch failed, tearing down session");
                self.teardown();
                Err(e)
            }
        }
    }

    /// Clear token, identity and persisted state. Never fails; storage
    /// errors are logged.
    pub fn logout(&self) {
        self.teardown();
        info!("Logged out");
    }

    /// Best-effort resume at startup.
    ///
    /// With a persisted token but no resolved identity, tries to fetch the
    /// identity; a failure ends unauthenticated without surfacing an error.
    pub async fn initialize(&self) {
        let session = self.snapshot();
        if session.token.is_none() || session.user.is_some() {
            debug!(
                has_token = session.token.is_some(),
                "Nothing to resume on startup"
            );
            return;
        }

        self.set_loading(true);
        match self.fetch_user().await {
            Ok(Some(user)) => info!(user_id = user.id, "Session resumed"),
            Ok(None) => {}
            Err(e) => info!(error = %e, "Persisted session could not be resumed"),
        }
        self.set_loading(false);
    }

    /// Tear the session down whenever the HTTP client reports a 401.
    ///
    /// The task ends when the store is dropped or the signal channel closes.
    pub fn watch_unauthorized(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.subscribe_unauthorized();
        let store = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(Unauthorized) | Err(RecvError::Lagged(_)) => {
                        let Some(store) = store.upgrade() else { break };
                        if store.token().is_some() {
                            info!("Unauthorized response observed, tearing down session");
                        }
                        store.teardown();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Unauthorized watcher stopped");
        })
    }

    async fn authenticate<B: Serialize>(&self, path: &str, body: &B) -> SessionResult<User> {
        self.set_loading(true);

        let result = self.sign_in_and_resolve(path, body).await;
        match &result {
            Ok(user) => info!(user_id = user.id, "Authenticated"),
            Err(e) => {
                warn!(error = %e, path = %path, "Authentication failed, tearing down session");
                self.teardown();
            }
        }

        self.set_loading(false);
        result
    }

    async fn sign_in_and_resolve<B: Serialize>(&self, path: &str, body: &B) -> SessionResult<User> {
        let auth: AuthToken = self.http.post_json(path, body).await?;
        self.adopt_token(&auth.access_token)?;
        self.resolve_identity(auth.access_token).await
    }

    fn adopt_token(&self, token: &str) -> SessionResult<()> {
        self.http.set_token(token)?;
        self.state.send_modify(|s| {
            s.token = Some(token.to_string());
            s.user = None;
        });
        self.persist()
    }

    /// Fetch `user/me` and store it if `token` is still the held token.
    async fn resolve_identity(&self, token: String) -> SessionResult<User> {
        let user: User = self.http.get_json("user/me").await?;

        let stored = self.state.send_if_modified(|s| {
            if s.token.as_deref() == Some(token.as_str()) {
                s.user = Some(user.clone());
                true
            } else {
                false
            }
        });
        if !stored {
            return Err(SessionError::Superseded);
        }

        self.persist()?;
        debug!(user_id = user.id, "Identity resolved");
        Ok(user)
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.loading != loading;
            s.loading = loading;
            changed
        });
    }

    fn teardown(&self) {
        if let Err(e) = self.http.clear_token() {
            warn!(error = %e, "Failed to clear persisted token");
        }

        self.state.send_if_modified(|s| {
            let changed = s.token.is_some() || s.user.is_some();
            s.token = None;
            s.user = None;
            changed
        });

        if let Err(e) = self.storage.delete(StorageKeys::SESSION) {
            warn!(error = %e, "Failed to clear persisted session");
        }
    }

    fn persist(&self) -> SessionResult<()> {
        let snapshot = Session {
            loading: false,
            ..self.snapshot()
        };

        if snapshot.token.is_none() {
            self.storage.delete(StorageKeys::SESSION)?;
            return Ok(());
        }

        let encoded = serde_json::to_string(&snapshot)?;
        self.storage.set(StorageKeys::SESSION, &encoded)?;
        Ok(())
    }
}

fn restore_session(http: &HttpClient, storage: &dyn KeyValueStorage) -> Session {
    let token = http.token();

    let persisted = match storage.get(StorageKeys::SESSION) {
        Ok(Some(raw)) => match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable persisted session");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Failed to read persisted session");
            None
        }
    };

    let user = match (&token, persisted) {
        (Some(token), Some(session)) if session.token.as_deref() == Some(token.as_str()) => {
            session.user
        }
        _ => None,
    };

    Session {
        token,
        user,
        loading: false,
    }
}
