//! Main client implementation and the authenticated request pipeline.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use url::Url;

use crate::api::{AuthApi, CategoriesApi, DashboardApi, ExpensesApi};
use crate::authorizer::{DEFAULT_AUTH_PREFIX, RequestAuthorizer};
use crate::error::{Error, Result};
use crate::gateway::AuthGateway;
use crate::refresh::RefreshCoordinator;
use crate::request::ApiRequest;
use crate::session::SessionController;
use crate::token_store::{TokenStorage, TokenStore};
use crate::transport::Transport;

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Tally API client.
///
/// Every business request goes through the authenticated pipeline: the
/// stored access token is attached, a 401 on a bearer request triggers one
/// shared refresh, and the request is replayed once with the new token.
///
/// # Example
///
/// ```no_run
/// use tally_client::{LoginRequest, TallyClient};
///
/// # async fn example() -> tally_client::Result<()> {
/// let client = TallyClient::builder()
///     .base_url("http://localhost:8080")
///     .build()?;
///
/// client
///     .auth()
///     .login(&LoginRequest {
///         email: "me@example.com".into(),
///         password: "secret".into(),
///         remember_me: false,
///     })
///     .await?;
///
/// let categories = client.categories().list().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TallyClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    pub(crate) transport: Transport,
    pub(crate) authorizer: RequestAuthorizer,
    pub(crate) tokens: TokenStore,
    pub(crate) gateway: Arc<AuthGateway>,
    pub(crate) session: SessionController,
    pub(crate) refresh: RefreshCoordinator,
}

impl std::fmt::Debug for TallyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TallyClient")
            .field("base_url", &self.inner.transport.base_url().as_str())
            .field("logged_in", &self.inner.tokens.exists())
            .finish()
    }
}

impl TallyClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client with default settings pointing to localhost.
    pub fn localhost() -> Result<Self> {
        Self::builder().base_url("http://127.0.0.1:8080").build()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        self.inner.transport.base_url()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline components
    // ─────────────────────────────────────────────────────────────────────────

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    pub fn gateway(&self) -> &AuthGateway {
        &self.inner.gateway
    }

    pub fn session(&self) -> &SessionController {
        &self.inner.session
    }

    pub fn authorizer(&self) -> &RequestAuthorizer {
        &self.inner.authorizer
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.inner.refresh
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the auth API (login, register, password reset, logout).
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Access the expenses API.
    pub fn expenses(&self) -> ExpensesApi {
        ExpensesApi::new(self.clone())
    }

    /// Access the categories API.
    pub fn categories(&self) -> CategoriesApi {
        CategoriesApi::new(self.clone())
    }

    /// Access the dashboard API.
    pub fn dashboard(&self) -> DashboardApi {
        DashboardApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a request through the authenticated pipeline.
    ///
    /// Non-success responses are returned as responses, not errors, except
    /// when a refresh fails: then the refresh error is returned in place of
    /// the original 401.
    pub async fn send(&self, request: ApiRequest) -> Result<reqwest::Response> {
        let inner = &self.inner;

        if inner.authorizer.classify(&request).is_auth_route {
            return inner.transport.dispatch(&request).await;
        }

        let (token, epoch) = inner.tokens.snapshot();
        let attempt = inner.authorizer.attach(&request, token.as_deref());
        let response = inner.transport.dispatch(&attempt).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        // Without a bearer token a 401 says nothing about expiry.
        if !RequestAuthorizer::has_bearer(&attempt) {
            tracing::debug!(path = request.url().path(), "401 on unauthenticated request");
            return Ok(response);
        }

        let token = inner.refresh.recover(epoch).await?;

        // Replayed once. A second 401 is final.
        tracing::debug!(path = request.url().path(), "Replaying request with refreshed token");
        let replay = inner.authorizer.attach(&request, Some(&token));
        inner.transport.dispatch(&replay).await
    }

    /// Build a request for an API path.
    pub fn request(&self, method: Method, path: &str) -> Result<ApiRequest> {
        Ok(ApiRequest::new(method, self.inner.transport.url(path)?))
    }

    /// Make a GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(Method::GET, path)?;
        self.execute(request).await
    }

    /// Make a GET request with query parameters.
    pub(crate) async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let request = self.request(Method::GET, path)?.query(query)?;
        self.execute(request).await
    }

    /// Make a POST request, ignoring the response body.
    pub(crate) async fn post<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: serde::Serialize + ?Sized,
    {
        let request = self.request(Method::POST, path)?.json(body)?;
        self.execute_empty(request).await
    }

    /// Make a PUT request, ignoring the response body.
    pub(crate) async fn put<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: serde::Serialize + ?Sized,
    {
        let request = self.request(Method::PUT, path)?.json(body)?;
        self.execute_empty(request).await
    }

    /// Make a DELETE request.
    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        let request = self.request(Method::DELETE, path)?;
        self.execute_empty(request).await
    }

    /// Send through the pipeline and decode the JSON body.
    pub async fn execute<T: serde::de::DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        self.inner.transport.read_json(response).await
    }

    /// Send through the pipeline and accept any success status.
    pub async fn execute_empty(&self, request: ApiRequest) -> Result<()> {
        let response = self.send(request).await?;
        self.inner.transport.read_empty(response).await
    }
}

/// Builder for creating a TallyClient.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
    auth_prefix: String,
    storage: Option<Arc<dyn TokenStorage>>,
    tokens: Option<TokenStore>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            auth_prefix: DEFAULT_AUTH_PREFIX.to_string(),
            storage: None,
            tokens: None,
        }
    }

    /// Set the base URL for the server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout. Ignored in the browser.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Path prefix of the authentication endpoints (default `/api/auth/`).
    pub fn auth_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.auth_prefix = prefix.into();
        self
    }

    /// Storage backend for the access token.
    pub fn token_storage(mut self, storage: Arc<dyn TokenStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Use an existing token store (shared with other components).
    pub fn token_store(mut self, tokens: TokenStore) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<TallyClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let auth_prefix = self.auth_prefix.trim_matches('/');
        if auth_prefix.is_empty() {
            return Err(Error::Config("auth_prefix must not be empty".to_string()));
        }
        let auth_prefix = format!("/{}/", auth_prefix);

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("tally-client/{}", env!("CARGO_PKG_VERSION")));

        let tokens = match (self.tokens, self.storage) {
            (Some(tokens), _) => tokens,
            (None, Some(storage)) => TokenStore::new(storage),
            (None, None) => TokenStore::detect(),
        };

        let transport = Transport::new(base_url, self.timeout, &user_agent)?;
        let gateway = Arc::new(AuthGateway::new(transport.clone(), &auth_prefix));
        let session = SessionController::new(tokens.clone(), gateway.clone());
        let refresh = RefreshCoordinator::new(gateway.clone(), tokens.clone(), session.clone());

        Ok(TallyClient {
            inner: Arc::new(ClientInner {
                transport,
                authorizer: RequestAuthorizer::new(auth_prefix),
                tokens,
                gateway,
                session,
                refresh,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
