//! CLI command handlers.

pub mod auth;
pub mod categories;
pub mod config;
pub mod dashboard;
pub mod expenses;
pub mod status;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use tally_client::{LoginRequest, SessionEvent, TallyClient};
use tally_config::ClientConfig;
use tokio::sync::broadcast;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Server URL to connect to.
    pub server_url: String,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Loaded client configuration.
    pub config: ClientConfig,
    /// Where the config file lives, whether or not it exists yet.
    pub config_path: Option<PathBuf>,
}

impl Context {
    /// Build a client for the configured server.
    pub fn client(&self) -> Result<TallyClient> {
        let mut builder = TallyClient::builder()
            .base_url(&self.server_url)
            .timeout(self.config.timeout())
            .auth_prefix(&self.config.auth_prefix);
        if let Some(agent) = &self.config.user_agent {
            builder = builder.user_agent(agent);
        }
        Ok(builder.build()?)
    }
}

/// Account credentials for commands that need a session.
#[derive(Args, Debug, Clone)]
pub struct Credentials {
    /// Account email
    #[arg(long, global = true, env = "TALLY_EMAIL")]
    pub email: Option<String>,

    /// Account password (prompted for when unset)
    #[arg(long, global = true, env = "TALLY_PASSWORD", hide = true, hide_env_values = true)]
    pub password: Option<String>,
}

impl Credentials {
    pub fn is_present(&self) -> bool {
        self.email.is_some()
    }

    /// Email and password, prompting for the password when unset.
    pub fn resolve(&self) -> Result<(String, String)> {
        let Some(email) = self.email.clone() else {
            bail!("no account given; pass --email or set TALLY_EMAIL");
        };
        let password = match &self.password {
            Some(password) => password.clone(),
            None => rpassword::prompt_password(format!("Password for {}: ", email))?,
        };
        Ok((email, password))
    }
}

/// A signed-in client for the length of one command.
pub struct Session {
    client: TallyClient,
    events: broadcast::Receiver<SessionEvent>,
}

impl Session {
    /// Sign in with the given credentials.
    pub async fn open(ctx: &Context, credentials: &Credentials) -> Result<Self> {
        let (email, password) = credentials.resolve()?;
        Self::login(ctx, email, password).await
    }

    /// Sign in with an already resolved email and password.
    pub async fn login(ctx: &Context, email: String, password: String) -> Result<Self> {
        let client = ctx.client()?;
        let events = client.session().subscribe();

        client
            .auth()
            .login(&LoginRequest {
                email,
                password,
                remember_me: false,
            })
            .await?;
        tracing::debug!("Signed in");

        Ok(Self { client, events })
    }

    pub fn client(&self) -> &TallyClient {
        &self.client
    }

    /// Report any forced logout, then sign out if still signed in.
    pub async fn close(mut self) {
        while let Ok(event) = self.events.try_recv() {
            if let SessionEvent::ForcedLogout { reason } = event {
                let yellow = Style::new().yellow();
                eprintln!(
                    "{} session ended by the server ({})",
                    yellow.apply_to("Signed out:"),
                    reason
                );
            }
        }

        if self.client.session().is_logged_in() {
            self.client.auth().logout().await;
            tracing::debug!("Signed out");
        }
    }
}

/// Print a value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Shorten text for one-line listings.
pub fn truncate(s: &str, max_len: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_len {
        s
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
