//! Network calls to the authentication surface (`/api/auth/*` by default).
//!
//! Every method is a single round trip: no retries, no status
//! interpretation beyond turning a failure status into [`Error::Api`].

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderValue};

use crate::error::{Error, Result};
use crate::request::ApiRequest;
use crate::transport::Transport;
use crate::types::{
    AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest,
};

/// Stateless client for the auth endpoints.
#[derive(Debug, Clone)]
pub struct AuthGateway {
    transport: Transport,
    /// Path of the auth surface relative to the base URL, e.g. `api/auth/`.
    prefix: String,
}

impl AuthGateway {
    pub(crate) fn new(transport: Transport, auth_prefix: &str) -> Self {
        let prefix = auth_prefix.trim_matches('/');
        Self {
            transport,
            prefix: format!("{}/", prefix),
        }
    }

    /// `POST /api/auth/login`. Receives the refresh cookie.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let req = self.post("login")?.with_credentials().json(request)?;
        self.send_json(req).await
    }

    /// `POST /api/auth/register`. Receives the refresh cookie.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let req = self.post("register")?.with_credentials().json(request)?;
        self.send_json(req).await
    }

    /// `POST /api/auth/refresh`. Presents the refresh cookie and receives a
    /// rotated one along with a fresh access token.
    pub async fn refresh(&self) -> Result<AuthResponse> {
        let req = self
            .post("refresh")?
            .with_credentials()
            .json(&serde_json::json!({}))?;
        self.send_json(req).await
    }

    /// `POST /api/auth/logout`. Revokes the refresh cookie server-side.
    pub async fn logout(&self) -> Result<()> {
        let req = self
            .post("logout")?
            .with_credentials()
            .json(&serde_json::json!({}))?;
        self.send_empty(req).await
    }

    /// `POST /api/auth/forgot-password`.
    pub async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<()> {
        let req = self.post("forgot-password")?.json(request)?;
        self.send_empty(req).await
    }

    /// `POST /api/auth/reset-password`.
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<()> {
        let req = self.post("reset-password")?.json(request)?;
        self.send_empty(req).await
    }

    /// `POST /api/auth/change-password`, authenticated with `access_token`.
    ///
    /// On success the server also drops this device's refresh cookie.
    pub async fn change_password(
        &self,
        access_token: &str,
        request: &ChangePasswordRequest,
    ) -> Result<()> {
        let req = self
            .post("change-password")?
            .with_credentials()
            .header(AUTHORIZATION, bearer(access_token)?)
            .json(request)?;
        self.send_empty(req).await
    }

    /// `POST /api/auth/logout-all`, authenticated with `access_token`.
    /// Revokes every refresh credential of the user.
    pub async fn logout_all(&self, access_token: &str) -> Result<()> {
        let req = self
            .post("logout-all")?
            .with_credentials()
            .header(AUTHORIZATION, bearer(access_token)?)
            .json(&serde_json::json!({}))?;
        self.send_empty(req).await
    }

    fn post(&self, endpoint: &str) -> Result<ApiRequest> {
        let url = self.transport.url(&format!("{}{}", self.prefix, endpoint))?;
        Ok(ApiRequest::new(Method::POST, url))
    }

    async fn send_json<T: serde::de::DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.transport.dispatch(&request).await?;
        self.transport.read_json(response).await
    }

    async fn send_empty(&self, request: ApiRequest) -> Result<()> {
        let response = self.transport.dispatch(&request).await?;
        self.transport.read_empty(response).await
    }
}

fn bearer(token: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| Error::Config("Invalid access token".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}
