//! Status command - server reachability and a session round trip.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use reqwest::Method;
use serde::Serialize;

use super::{Context, Credentials, Session};

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub credentials: Credentials,
}

/// Status response for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    reachable: bool,
    http_status: Option<u16>,
    server_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<SessionCheck>,
}

#[derive(Debug, Serialize)]
struct SessionCheck {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;

    let reachability = client
        .send(client.request(Method::GET, "")?)
        .await
        .map(|response| response.status().as_u16());

    let session = if reachability.is_ok() && args.credentials.is_present() {
        Some(check_session(&args.credentials, ctx).await)
    } else {
        None
    };

    let output = StatusOutput {
        reachable: reachability.is_ok(),
        http_status: reachability.as_ref().ok().copied(),
        server_url: ctx.server_url.clone(),
        session,
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let green = Style::new().green();
    let red = Style::new().red();
    let dim = Style::new().dim();

    println!();
    println!("{}", style("Tally Server Status").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    if output.reachable {
        println!("  {} {}", dim.apply_to("Status:"), green.apply_to("● reachable"));
    } else {
        println!("  {} {}", dim.apply_to("Status:"), red.apply_to("● unreachable"));
    }
    println!("  {} {}", dim.apply_to("Server:"), ctx.server_url);

    if let Err(e) = &reachability
        && ctx.verbose
    {
        println!();
        println!("  {} {}", dim.apply_to("Error:"), e);
    }

    if let Some(check) = &output.session {
        if check.ok {
            println!("  {} {}", dim.apply_to("Session:"), green.apply_to("● signed in and out"));
        } else {
            println!("  {} {}", dim.apply_to("Session:"), red.apply_to("● failed"));
            if let Some(error) = &check.error {
                println!("  {} {}", dim.apply_to("Error:"), error);
            }
        }
    }
    println!();

    Ok(())
}

/// Sign in, make one authenticated call, sign out.
async fn check_session(credentials: &Credentials, ctx: &Context) -> SessionCheck {
    let session = match Session::open(ctx, credentials).await {
        Ok(session) => session,
        Err(e) => {
            return SessionCheck {
                ok: false,
                error: Some(e.to_string()),
            };
        }
    };

    let result = session.client().categories().list().await;
    session.close().await;

    match result {
        Ok(_) => SessionCheck {
            ok: true,
            error: None,
        },
        Err(e) => SessionCheck {
            ok: false,
            error: Some(e.user_message()),
        },
    }
}
