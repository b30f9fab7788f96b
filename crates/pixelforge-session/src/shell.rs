//! Application-shell reaction to the unauthorized signal.

use crate::guard::Route;
use crate::SessionStore;
use pixelforge_http::Unauthorized;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// The shell's navigation surface.
pub trait Navigator: Send + Sync {
    /// Route currently shown, if any.
    fn current_route(&self) -> Option<Route>;

    /// Move to `route`.
    fn navigate(&self, route: Route);
}

/// Forces logout and a redirect to sign-in whenever a request gets a 401,
/// unless the shell is already on the sign-in route.
pub struct UnauthorizedWatcher<N> {
    store: Arc<SessionStore>,
    navigator: Arc<N>,
}

impl<N: Navigator + 'static> UnauthorizedWatcher<N> {
    pub fn new(store: Arc<SessionStore>, navigator: Arc<N>) -> Self {
        Self { store, navigator }
    }

    /// React to one emission. Returns whether a redirect happened.
    pub fn handle(&self) -> bool {
        if self.navigator.current_route() == Some(Route::SignIn) {
            debug!("Unauthorized signal ignored on sign-in route");
            return false;
        }

        self.store.logout();
        self.navigator.navigate(Route::SignIn);
        info!("Session ended by server, redirected to sign-in");
        true
    }

    /// Consume emissions until the channel closes.
    pub async fn run(self, mut rx: broadcast::Receiver<Unauthorized>) {
        loop {
            match rx.recv().await {
                Ok(Unauthorized) => {
                    self.handle();
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Unauthorized watcher lagged");
                    self.handle();
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Subscribe now and run on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        let rx = self.store.subscribe_unauthorized();
        tokio::spawn(self.run(rx))
    }
}
