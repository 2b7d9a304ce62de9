//! Auth API.
//!
//! Sign-in flows on top of [`AuthGateway`](crate::gateway::AuthGateway):
//! the gateway does the network call, the session controller records the
//! outcome.

use crate::client::TallyClient;
use crate::error::Result;
use crate::types::{
    AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest,
};

/// Auth API client.
pub struct AuthApi {
    client: TallyClient,
}

impl AuthApi {
    pub(crate) fn new(client: TallyClient) -> Self {
        Self { client }
    }

    /// Sign in and store the issued access token.
    ///
    /// Errors (wrong password, unknown user) come back as-is; the refresh
    /// machinery never sees them.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let response = self.client.gateway().login(request).await?;
        self.client.session().set_access_token(&response.access_token);
        Ok(response)
    }

    /// Create an account and sign in with it.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let response = self.client.gateway().register(request).await?;
        self.client.session().set_access_token(&response.access_token);
        Ok(response)
    }

    /// Request a password reset email.
    pub async fn forgot_password(&self, email: impl Into<String>) -> Result<()> {
        self.client
            .gateway()
            .forgot_password(&ForgotPasswordRequest {
                email: email.into(),
            })
            .await
    }

    /// Set a new password using the token from the reset email.
    pub async fn reset_password(
        &self,
        token: impl Into<String>,
        new_password: impl Into<String>,
    ) -> Result<()> {
        self.client
            .gateway()
            .reset_password(&ResetPasswordRequest {
                token: token.into(),
                new_password: new_password.into(),
            })
            .await
    }

    /// Change the password of the signed-in user. Ends the local session.
    pub async fn change_password(
        &self,
        current_password: impl Into<String>,
        new_password: impl Into<String>,
    ) -> Result<()> {
        self.client
            .session()
            .change_password(&ChangePasswordRequest {
                current_password: current_password.into(),
                new_password: new_password.into(),
            })
            .await
    }

    /// Sign out. Always ends the local session.
    pub async fn logout(&self) {
        self.client.session().logout().await
    }

    /// Sign out on every device.
    pub async fn logout_everywhere(&self) -> Result<()> {
        self.client.session().logout_everywhere().await
    }

    pub fn is_logged_in(&self) -> bool {
        self.client.session().is_logged_in()
    }
}
