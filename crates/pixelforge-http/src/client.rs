//! Shared HTTP client with bearer decoration and 401 interception.

use crate::{ApiError, ApiResult, ClientConfig, Unauthorized, UnauthorizedSignal};
use parking_lot::RwLock;
use pixelforge_storage::{KeyValueStorage, StorageKeys};
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

/// Longest server error body carried into an error message.
const MAX_ERROR_MESSAGE_CHARS: usize = 512;

/// FastAPI-style error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// The single HTTP transport shared by every PixelForge client component.
///
/// Every request built through [`HttpClient::request`] carries the current
/// bearer token, and every response passes through [`HttpClient::send`],
/// which tears the token down and fires the [`UnauthorizedSignal`] on a 401
/// before handing the error back to the caller.
pub struct HttpClient {
    http: reqwest::Client,
    config: ClientConfig,
    token: RwLock<Option<String>>,
    storage: Arc<dyn KeyValueStorage>,
    signal: UnauthorizedSignal,
}

impl HttpClient {
    /// Create the client, picking up any token persisted by a previous run.
    pub fn new(config: ClientConfig, storage: Arc<dyn KeyValueStorage>) -> ApiResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let token = storage.get(StorageKeys::TOKEN)?;

        debug!(
            base_url = %config.base_url,
            timeout_secs = config.timeout.as_secs(),
            has_token = token.is_some(),
            "HTTP client created"
        );

        Ok(Self {
            http,
            config,
            token: RwLock::new(token),
            storage,
            signal: UnauthorizedSignal::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The signal fired on every 401 response.
    pub fn signal(&self) -> &UnauthorizedSignal {
        &self.signal
    }

    /// Subscribe to the unauthorized signal.
    pub fn subscribe_unauthorized(&self) -> broadcast::Receiver<Unauthorized> {
        self.signal.subscribe()
    }

    /// Current bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    /// Hold `token` for subsequent requests and persist it.
    pub fn set_token(&self, token: &str) -> ApiResult<()> {
        *self.token.write() = Some(token.to_string());
        self.storage.set(StorageKeys::TOKEN, token)?;
        debug!("Bearer token set");
        Ok(())
    }

    /// Drop the token from memory and storage. Idempotent.
    pub fn clear_token(&self) -> ApiResult<()> {
        let had_token = self.token.write().take().is_some();
        self.storage.delete(StorageKeys::TOKEN)?;
        if had_token {
            debug!("Bearer token cleared");
        }
        Ok(())
    }

    /// Resolve an API path against the base endpoint.
    pub fn url(&self, path: &str) -> ApiResult<Url> {
        Ok(self.config.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Start a request, decorated with the bearer token held right now.
    ///
    /// The header is fixed when the builder is created; a token change
    /// afterwards does not affect this request.
    pub fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = self.url(path)?;
        let builder = self.http.request(method, url);

        Ok(match self.token.read().as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Send a request and intercept the response.
    ///
    /// 2xx responses are returned as-is. A 401 clears the token and emits the
    /// unauthorized signal before [`ApiError::Unauthorized`] is returned.
    /// Any other status becomes [`ApiError::Server`].
    pub async fn send(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, timeout = e.is_timeout(), "Request failed before a response");
            ApiError::Transport(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().clone();

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Unauthorized {
                message: error_message(&body, status),
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body, status);
        warn!(status = status.as_u16(), url = %url, message = %message, "Request rejected");

        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }

    fn handle_unauthorized(&self) {
        info!("Received 401, clearing session token");
        if let Err(e) = self.clear_token() {
            warn!(error = %e, "Failed to remove persisted token");
        }
        self.signal.emit();
    }

    /// GET `path` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        Ok(response.json().await?)
    }

    /// GET `path` with query parameters and decode a JSON body.
    pub async fn get_json_with_query<T, Q>(&self, path: &str, query: &Q) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path)?.query(query);
        let response = self.send(builder).await?;
        Ok(response.json().await?)
    }

    /// POST a JSON body to `path` and decode a JSON body.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path)?.json(body);
        let response = self.send(builder).await?;
        Ok(response.json().await?)
    }

    /// POST a multipart form to `path` and decode a JSON body.
    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> ApiResult<T> {
        let builder = self.request(Method::POST, path)?.multipart(form);
        let response = self.send(builder).await?;
        Ok(response.json().await?)
    }

    /// GET `path` in binary mode.
    pub async fn get_bytes(&self, path: &str) -> ApiResult<Vec<u8>> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn error_message(body: &str, status: StatusCode) -> String {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };

    message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}
