//! Session lifecycle: sign-in bookkeeping, forced and voluntary logout.
//!
//! Navigation is signalled, not performed: every transition to the
//! logged-out view is published as a [`SessionEvent`] on a broadcast
//! channel that the UI layer subscribes to.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::gateway::AuthGateway;
use crate::token_store::TokenStore;
use crate::types::ChangePasswordRequest;

/// Capacity of the session event channel. Slow subscribers see `Lagged`.
const EVENT_CAPACITY: usize = 16;

/// Why the session was ended without the user asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The refresh credential could not mint a new access token.
    Expired,
    /// The server rejected the user outright.
    Unauthorized,
}

impl LogoutReason {
    /// Value used in the login view's `reason` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogoutReason::Expired => "expired",
            LogoutReason::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session transitions published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A token was stored after login or registration.
    SignedIn,
    /// The user signed out; show the login view.
    SignedOut,
    /// The session was torn down; show the login view with `reason`.
    ForcedLogout { reason: LogoutReason },
}

/// Owner of session state transitions.
///
/// The session is authenticated exactly when the [`TokenStore`] holds a
/// token; nothing else is tracked.
#[derive(Debug, Clone)]
pub struct SessionController {
    tokens: TokenStore,
    gateway: Arc<AuthGateway>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub(crate) fn new(tokens: TokenStore, gateway: Arc<AuthGateway>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tokens,
            gateway,
            events,
        }
    }

    /// Receive session transitions from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_logged_in(&self) -> bool {
        self.tokens.exists()
    }

    /// Store a freshly issued token and announce the sign-in.
    pub fn set_access_token(&self, token: &str) {
        self.tokens.set(token);
        self.emit(SessionEvent::SignedIn);
    }

    /// Drop the local token without any navigation.
    pub fn clear_session(&self) {
        self.tokens.clear();
    }

    /// Tear the session down and send the user to the login view.
    ///
    /// Safe to call when already anonymous: nothing more is cleared but the
    /// navigation signal is still sent.
    pub fn force_logout(&self, reason: LogoutReason) {
        tracing::info!(%reason, "Forcing logout");
        self.tokens.clear();
        self.emit(SessionEvent::ForcedLogout { reason });
    }

    /// Send the forced-logout signal for a store the caller already cleared.
    pub(crate) fn announce_forced_logout(&self, reason: LogoutReason) {
        tracing::info!(%reason, "Session ended by failed refresh");
        self.emit(SessionEvent::ForcedLogout { reason });
    }

    /// User-initiated logout.
    ///
    /// Asks the server to revoke the refresh cookie, then clears local state
    /// whatever the server said. Backend failures are logged and absorbed.
    pub async fn logout(&self) {
        if let Err(e) = self.gateway.logout().await {
            tracing::warn!(error = %e, "Logout request failed, clearing local session anyway");
        }
        self.tokens.clear();
        self.emit(SessionEvent::SignedOut);
    }

    /// Revoke every refresh credential of the user, then clear local state.
    ///
    /// Local state is cleared even if the server call fails; the failure is
    /// still returned so the caller can tell the user other devices may
    /// remain signed in.
    pub async fn logout_everywhere(&self) -> Result<()> {
        let result = match self.tokens.get() {
            Some(token) => self.gateway.logout_all(&token).await,
            None => Err(Error::NotAuthenticated),
        };
        self.tokens.clear();
        self.emit(SessionEvent::SignedOut);
        result
    }

    /// Change the password. The server drops this device's refresh cookie
    /// on success, so the local session ends too.
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<()> {
        let token = self.tokens.get().ok_or(Error::NotAuthenticated)?;
        self.gateway.change_password(&token, request).await?;
        self.tokens.clear();
        self.emit(SessionEvent::SignedOut);
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
