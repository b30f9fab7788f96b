//! CLI command implementations.

mod auth;
mod jobs;

pub use auth::{login, logout, register, status};
pub use jobs::{
    formats, jobs_convert, jobs_download, jobs_info, jobs_list, jobs_preview, jobs_status,
};

use crate::output::OutputFormat;
use anyhow::Result;
use parking_lot::Mutex;
use pixelforge_http::{ClientConfig, HttpClient};
use pixelforge_jobs::JobClient;
use pixelforge_session::{Navigator, Route, SessionStore, UnauthorizedWatcher};
use pixelforge_storage::{create_storage, KeyValueStorage};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs, wired once at startup.
pub struct Context {
    pub store: Arc<SessionStore>,
    pub jobs: JobClient,
    pub format: OutputFormat,
    navigator: Arc<CliNavigator>,
}

impl Context {
    /// Build the client stack on the default persistent storage, resume any
    /// persisted session and start reacting to 401s while `route` is shown.
    pub async fn connect(
        config: ClientConfig,
        format: OutputFormat,
        route: Option<Route>,
    ) -> Result<Self> {
        let storage: Arc<dyn KeyValueStorage> = Arc::from(create_storage()?);
        Self::with_storage(config, storage, format, route).await
    }

    /// Same as [`Context::connect`] over an explicit storage backend.
    pub async fn with_storage(
        config: ClientConfig,
        storage: Arc<dyn KeyValueStorage>,
        format: OutputFormat,
        route: Option<Route>,
    ) -> Result<Self> {
        let http = Arc::new(HttpClient::new(config, storage.clone())?);
        let store = SessionStore::start(http.clone(), storage);
        let navigator = Arc::new(CliNavigator::new(route));

        UnauthorizedWatcher::new(store.clone(), navigator.clone()).spawn();
        store.initialize().await;
        debug!(phase = ?store.phase(), "Session resumed");

        Ok(Self {
            store,
            jobs: JobClient::new(http),
            format,
            navigator,
        })
    }

    /// Whether the server ended the session while this command ran.
    pub fn redirected_to_sign_in(&self) -> bool {
        self.navigator.redirected()
    }
}

/// Terminal stand-in for the application shell's router.
pub struct CliNavigator {
    current: Mutex<Option<Route>>,
    redirected: Mutex<bool>,
}

impl CliNavigator {
    pub fn new(route: Option<Route>) -> Self {
        Self {
            current: Mutex::new(route),
            redirected: Mutex::new(false),
        }
    }

    pub fn redirected(&self) -> bool {
        *self.redirected.lock()
    }
}

impl Navigator for CliNavigator {
    fn current_route(&self) -> Option<Route> {
        *self.current.lock()
    }

    fn navigate(&self, route: Route) {
        *self.current.lock() = Some(route);
        if route == Route::SignIn {
            *self.redirected.lock() = true;
            eprintln!("Session expired. Run 'pixelforge login' to sign in again.");
        }
    }
}

/// Prompt for a single line on stdin.
fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelforge_storage::{MemoryStorage, StorageKeys};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(super) async fn context_for(
        server: &MockServer,
        storage: Arc<MemoryStorage>,
        route: Option<Route>,
    ) -> Context {
        let config = ClientConfig::new(&format!("{}/api/v1/", server.uri())).unwrap();
        Context::with_storage(config, storage, OutputFormat::Text, route)
            .await
            .unwrap()
    }

    fn signed_in_storage() -> Arc<MemoryStorage> {
        let session = serde_json::json!({
            "token": "T0",
            "user": {"id": 1, "email": "a@b.com"},
            "loading": false
        });
        Arc::new(MemoryStorage::with_entries([
            (StorageKeys::TOKEN.to_string(), "T0".to_string()),
            (StorageKeys::SESSION.to_string(), session.to_string()),
        ]))
    }

    #[tokio::test]
    async fn test_unauthorized_on_sign_in_route_still_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/format/image"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let storage = signed_in_storage();
        let ctx = context_for(&server, storage.clone(), Some(Route::SignIn)).await;
        assert!(ctx.store.is_authenticated());

        let mut changes = ctx.store.subscribe();
        assert!(ctx.jobs.supported_target_formats().await.is_err());
        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            changes.wait_for(|s| s.token.is_none()),
        )
        .await
        .expect("session torn down")
        .unwrap();

        assert!(!ctx.store.is_authenticated());
        assert!(!storage.has(StorageKeys::SESSION).unwrap());
        assert!(!ctx.redirected_to_sign_in());
    }

    #[test]
    fn test_navigator_records_sign_in_redirect() {
        let navigator = CliNavigator::new(Some(Route::Home));
        assert!(!navigator.redirected());

        navigator.navigate(Route::SignIn);
        assert!(navigator.redirected());
        assert_eq!(navigator.current_route(), Some(Route::SignIn));
    }

    #[test]
    fn test_navigator_other_routes_are_silent() {
        let navigator = CliNavigator::new(None);
        navigator.navigate(Route::Home);
        assert!(!navigator.redirected());
        assert_eq!(navigator.current_route(), Some(Route::Home));
    }
}
