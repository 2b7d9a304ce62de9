//! Authenticated HTTP client for the Tally expense tracker API.
//!
//! The backend issues short-lived bearer access tokens and keeps a
//! longer-lived refresh credential in an HTTP-only cookie. This crate keeps
//! every request supplied with a valid access token without the caller
//! noticing expiry:
//!
//! - [`token_store`] holds the current access token for the session
//! - [`authorizer`] decides whether a request gets the bearer header and
//!   whether it belongs to the exempt auth surface
//! - [`gateway`] makes the login/register/refresh/logout/password calls
//! - [`refresh`] turns any number of concurrent 401s into one refresh call
//!   and hands the new token to every waiting request
//! - [`session`] ends the session (and signals navigation) when refresh fails
//!
//! # Example
//!
//! ```no_run
//! use tally_client::{LoginRequest, SessionEvent, TallyClient};
//!
//! # async fn example() -> tally_client::Result<()> {
//! let client = TallyClient::builder()
//!     .base_url("http://localhost:8080")
//!     .build()?;
//!
//! // Forced logouts are announced here
//! let mut events = client.session().subscribe();
//!
//! client
//!     .auth()
//!     .login(&LoginRequest {
//!         email: "me@example.com".into(),
//!         password: "secret".into(),
//!         remember_me: true,
//!     })
//!     .await?;
//!
//! // Expired tokens are refreshed and the request replayed transparently.
//! let dashboard = client.dashboard().overview(&Default::default()).await?;
//! println!("spent {} over {} expenses", dashboard.summary.total, dashboard.summary.count);
//!
//! if let Ok(SessionEvent::ForcedLogout { reason }) = events.try_recv() {
//!     println!("signed out: {}", reason);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod authorizer;
pub mod client;
pub mod error;
pub mod gateway;
pub mod refresh;
pub mod request;
pub mod session;
pub mod token_store;
pub mod types;

mod transport;

pub use api::{DashboardQuery, DateRange, ExpenseQuery};
pub use authorizer::{RequestAuthorizer, RouteClass};
pub use client::{ClientBuilder, TallyClient};
pub use error::{Error, Result};
pub use gateway::AuthGateway;
pub use refresh::{RefreshCoordinator, RefreshState};
pub use request::ApiRequest;
pub use session::{LogoutReason, SessionController, SessionEvent};
pub use token_store::{MemoryStorage, TokenStorage, TokenStore};
#[cfg(target_arch = "wasm32")]
pub use token_store::BrowserSessionStorage;
pub use types::*;
