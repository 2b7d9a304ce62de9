//! Config command - inspect and create the client config file.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use console::Style;
use serde::Serialize;
use tally_config::ClientConfig;

use super::{Context, print_json};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show the config file path
    Path,

    /// Write a config file with defaults
    Init {
        /// Server URL to store (default: the current one)
        #[arg(long)]
        server: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    path: Option<String>,
    exists: bool,
    server_url: &'a str,
    config: &'a ClientConfig,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
        ConfigCommand::Init { server, force } => cmd_init(ctx, server, force),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let path = ctx.config_path.as_ref();
    let exists = path.is_some_and(|p| p.exists());

    if ctx.json_output {
        return print_json(&ShowOutput {
            path: path.map(|p| p.display().to_string()),
            exists,
            server_url: &ctx.server_url,
            config: &ctx.config,
        });
    }

    let dim = Style::new().dim();
    match path {
        Some(p) if exists => println!("{} {}", dim.apply_to("# Loaded from"), p.display()),
        _ => println!("{}", dim.apply_to("# No config file loaded (using defaults)")),
    }
    if ctx.server_url != ctx.config.server {
        println!("{} {}", dim.apply_to("# Server overridden with"), ctx.server_url);
    }
    println!();
    print!("{}", ctx.config.to_toml()?);
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    println!("{}", config_path(ctx)?.display());
    Ok(())
}

fn cmd_init(ctx: &Context, server: Option<String>, force: bool) -> Result<()> {
    let path = config_path(ctx)?;
    if path.exists() && !force {
        println!("Config file already exists: {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    let config = initial_config(&ctx.config, server);
    tally_config::save_client_config_to(&config, &path)?;
    tracing::info!(path = %path.display(), "Wrote config file");

    if ctx.json_output {
        return print_json(&serde_json::json!({
            "ok": true,
            "path": path.display().to_string(),
        }));
    }
    let green = Style::new().green();
    println!("{} Wrote {}", green.apply_to("✓"), path.display());
    Ok(())
}

fn config_path(ctx: &Context) -> Result<PathBuf> {
    ctx.config_path
        .clone()
        .ok_or_else(|| anyhow!("Could not determine config directory"))
}

/// Config written by `init`: the loaded one, with `server` swapped in.
fn initial_config(loaded: &ClientConfig, server: Option<String>) -> ClientConfig {
    let mut config = loaded.clone();
    if let Some(server) = server {
        config.server = server;
    }
    config
}
