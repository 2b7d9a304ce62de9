//! Tally - command-line client for the Tally expense tracker
//!
//! Main entry point for the Tally CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;

use commands::{auth, categories, config, dashboard, expenses, status};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Tally - track and review your expenses from the terminal
#[derive(Parser)]
#[command(name = "tally")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server URL (default: from config, else http://localhost:8080)
    #[arg(long, global = true, env = "TALLY_SERVER_URL")]
    pub server: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "TALLY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account
    Register(auth::RegisterArgs),

    /// Request a password reset email
    ForgotPassword(auth::ForgotPasswordArgs),

    /// Set a new password with a reset token
    ResetPassword(auth::ResetPasswordArgs),

    /// Change the password of your account
    ChangePassword(auth::ChangePasswordArgs),

    /// Sign out of every device
    LogoutAll(auth::LogoutAllArgs),

    /// Expense operations
    Expenses(expenses::ExpensesArgs),

    /// Category management
    Categories(categories::CategoriesArgs),

    /// Spending overview
    Dashboard(dashboard::DashboardArgs),

    /// Check the server and, with credentials, a full session round trip
    Status(status::StatusArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(tally_config::client_config_path);
    let config = tally_config::load_client_config_from(config_path.as_deref())
        .context("failed to load config")?;

    // Console (human-readable, stderr) + rotating JSON file
    let console_filter = if cli.verbose {
        EnvFilter::new("tally=debug,tally_client=debug,tally_config=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter))
    };

    let (file_layer, _guard) = match tally_config::log_dir().filter(|_| config.logging.file) {
        Some(log_dir) => match RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("tally")
            .filename_suffix("log")
            .build(&log_dir)
        {
            Ok(appender) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_filter(EnvFilter::new(
                        "tally=trace,tally_client=trace,tally_config=trace,info",
                    ));
                (Some(layer), Some(guard))
            }
            // No log file is not worth failing the command over.
            Err(_) => (None, None),
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    let server_url = cli.server.unwrap_or_else(|| config.server.clone());
    tracing::debug!(server = %server_url, "Using server");

    let ctx = commands::Context {
        server_url,
        json_output: cli.json,
        verbose: cli.verbose,
        config,
        config_path,
    };

    match cli.command {
        Commands::Register(args) => auth::register(args, &ctx).await,
        Commands::ForgotPassword(args) => auth::forgot_password(args, &ctx).await,
        Commands::ResetPassword(args) => auth::reset_password(args, &ctx).await,
        Commands::ChangePassword(args) => auth::change_password(args, &ctx).await,
        Commands::LogoutAll(args) => auth::logout_all(args, &ctx).await,
        Commands::Expenses(args) => expenses::run(args, &ctx).await,
        Commands::Categories(args) => categories::run(args, &ctx).await,
        Commands::Dashboard(args) => dashboard::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
