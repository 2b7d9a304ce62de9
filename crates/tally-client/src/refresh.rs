//! Single-flight access token refresh.
//!
//! When a request that carried a bearer token comes back 401, the pipeline
//! asks the [`RefreshCoordinator`] for a new token. The first caller in a
//! refresh window becomes the leader: it calls `/refresh`, stores the token
//! and publishes the outcome. Callers arriving while the leader is working
//! subscribe to that publication instead of starting their own refresh.
//!
//! Outcomes are published as `Result`, so waiters learn about a failed
//! refresh as well as a successful one. If the leader is dropped before
//! publishing, its sender goes away and waiters fail with
//! [`Error::RefreshAborted`].

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::gateway::AuthGateway;
use crate::session::{LogoutReason, SessionController};
use crate::token_store::TokenStore;

/// Value published once per refresh window. `None` until the leader finishes.
type Publication = Option<Result<String>>;

/// Coordinator state.
#[derive(Debug, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    /// A refresh is in flight; subscribe here for its outcome.
    Refreshing(watch::Receiver<Publication>),
}

impl RefreshState {
    pub fn is_refreshing(&self) -> bool {
        matches!(self, RefreshState::Refreshing(_))
    }
}

/// Role a caller takes in the current refresh window.
enum Role {
    Leader(watch::Sender<Publication>),
    Waiter(watch::Receiver<Publication>),
}

/// Serializes concurrent refresh attempts into one `/refresh` call.
///
/// One instance per client; clones of the client share it.
#[derive(Debug)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    gateway: Arc<AuthGateway>,
    tokens: TokenStore,
    session: SessionController,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        gateway: Arc<AuthGateway>,
        tokens: TokenStore,
        session: SessionController,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
            gateway,
            tokens,
            session,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().is_refreshing()
    }

    /// Obtain a token to replay a request that failed with 401.
    ///
    /// `epoch` is the token store epoch the failed request was authorized
    /// under; a token minted for a session that has since been cleared is
    /// thrown away and [`Error::SessionEnded`] returned instead.
    ///
    /// On refresh failure the token store is cleared and a forced logout
    /// with [`LogoutReason::Expired`] is signalled exactly once per window,
    /// by the leader. The refresh error is returned to every caller. If the
    /// session was cleared while the refresh ran, nothing is touched and
    /// every caller gets [`Error::SessionEnded`].
    pub async fn recover(&self, epoch: u64) -> Result<String> {
        match self.join() {
            Role::Leader(tx) => self.lead(tx, epoch).await,
            Role::Waiter(rx) => Self::wait(rx).await,
        }
    }

    /// Become the leader if idle, otherwise subscribe to the running refresh.
    fn join(&self) -> Role {
        let mut state = self.state.lock();
        match &*state {
            RefreshState::Refreshing(rx) => {
                tracing::debug!("Refresh already in flight, waiting for its outcome");
                Role::Waiter(rx.clone())
            }
            RefreshState::Idle => {
                let (tx, rx) = watch::channel(None);
                *state = RefreshState::Refreshing(rx);
                Role::Leader(tx)
            }
        }
    }

    async fn lead(&self, tx: watch::Sender<Publication>, epoch: u64) -> Result<String> {
        // Returns the coordinator to Idle however this future ends, including
        // being dropped mid-refresh.
        let mut window = Window {
            state: &self.state,
            open: true,
        };

        tracing::info!("Access token rejected, refreshing");
        let outcome = match self.gateway.refresh().await {
            Ok(response) => {
                if self.tokens.set_if_epoch(&response.access_token, epoch) {
                    tracing::info!(expires_in = response.expires_in, "Access token refreshed");
                    Ok(response.access_token)
                } else {
                    tracing::info!("Session was cleared during refresh, discarding new token");
                    Err(Error::SessionEnded)
                }
            }
            Err(e) => {
                if self.tokens.clear_if_epoch(epoch) {
                    tracing::warn!(error = %e, "Token refresh failed, ending session");
                    Err(e)
                } else {
                    tracing::info!(error = %e, "Token refresh failed after the session was cleared");
                    Err(Error::SessionEnded)
                }
            }
        };

        // Back to Idle before anyone is woken, so a replay that fails again
        // starts a fresh window instead of joining this finished one.
        window.close();
        let _ = tx.send(Some(outcome.clone()));

        if let Err(e) = &outcome
            && !matches!(e, Error::SessionEnded)
        {
            self.session.announce_forced_logout(LogoutReason::Expired);
        }

        outcome
    }

    async fn wait(mut rx: watch::Receiver<Publication>) -> Result<String> {
        let outcome = match rx.wait_for(|published| published.is_some()).await {
            Ok(published) => published.clone().unwrap_or(Err(Error::RefreshAborted)),
            // Leader dropped without publishing.
            Err(_) => Err(Error::RefreshAborted),
        };
        outcome
    }
}

/// The leader's hold on the current refresh window.
///
/// While open, the state is `Refreshing` with this leader's channel, so
/// resetting it on drop cannot clobber a later window.
struct Window<'a> {
    state: &'a Mutex<RefreshState>,
    open: bool,
}

impl Window<'_> {
    fn close(&mut self) {
        *self.state.lock() = RefreshState::Idle;
        self.open = false;
    }
}

impl Drop for Window<'_> {
    fn drop(&mut self) {
        if self.open {
            tracing::debug!("Refresh leader dropped before publishing");
            *self.state.lock() = RefreshState::Idle;
        }
    }
}
