//! Account commands - registration and password management.

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use serde::Serialize;
use tally_client::RegisterRequest;

use super::{Context, Credentials, Session, print_json};

/// Arguments for the register command.
#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Email for the new account
    pub email: String,
}

/// Arguments for the forgot-password command.
#[derive(Args, Debug)]
pub struct ForgotPasswordArgs {
    /// Email of the account
    pub email: String,
}

/// Arguments for the reset-password command.
#[derive(Args, Debug)]
pub struct ResetPasswordArgs {
    /// Token from the reset email
    pub token: String,
}

/// Arguments for the change-password command.
#[derive(Args, Debug)]
pub struct ChangePasswordArgs {
    #[command(flatten)]
    pub credentials: Credentials,
}

/// Arguments for the logout-all command.
#[derive(Args, Debug)]
pub struct LogoutAllArgs {
    #[command(flatten)]
    pub credentials: Credentials,
}

#[derive(Debug, Serialize)]
struct Outcome<'a> {
    ok: bool,
    action: &'a str,
}

/// Run the register command.
pub async fn register(args: RegisterArgs, ctx: &Context) -> Result<()> {
    let password = prompt_new_password()?;
    let client = ctx.client()?;

    client
        .auth()
        .register(&RegisterRequest {
            email: args.email.clone(),
            password,
        })
        .await?;

    // Registration signs in; the CLI keeps no session between runs.
    client.auth().logout().await;

    report(ctx, "register", &format!("Account created for {}", args.email))
}

/// Run the forgot-password command.
pub async fn forgot_password(args: ForgotPasswordArgs, ctx: &Context) -> Result<()> {
    ctx.client()?.auth().forgot_password(&args.email).await?;
    report(
        ctx,
        "forgot-password",
        "If the account exists, a reset email is on its way",
    )
}

/// Run the reset-password command.
pub async fn reset_password(args: ResetPasswordArgs, ctx: &Context) -> Result<()> {
    let password = prompt_new_password()?;
    ctx.client()?
        .auth()
        .reset_password(&args.token, password)
        .await?;
    report(ctx, "reset-password", "Password reset, sign in with the new one")
}

/// Run the change-password command.
pub async fn change_password(args: ChangePasswordArgs, ctx: &Context) -> Result<()> {
    let (email, current) = args.credentials.resolve()?;
    let new = prompt_new_password()?;

    let session = Session::login(ctx, email, current.clone()).await?;
    let result = session.client().auth().change_password(current, new).await;
    session.close().await;
    result?;

    report(ctx, "change-password", "Password changed, sign in again")
}

/// Run the logout-all command.
pub async fn logout_all(args: LogoutAllArgs, ctx: &Context) -> Result<()> {
    let session = Session::open(ctx, &args.credentials).await?;
    let result = session.client().auth().logout_everywhere().await;
    session.close().await;
    result?;

    report(ctx, "logout-all", "Signed out on every device")
}

fn prompt_new_password() -> Result<String> {
    if let Ok(password) = std::env::var("TALLY_NEW_PASSWORD")
        && !password.is_empty()
    {
        return Ok(password);
    }

    let first = rpassword::prompt_password("New password: ")?;
    let second = rpassword::prompt_password("Repeat new password: ")?;
    if first != second {
        bail!("passwords do not match");
    }
    if first.is_empty() {
        bail!("password must not be empty");
    }
    Ok(first)
}

fn report(ctx: &Context, action: &str, message: &str) -> Result<()> {
    if ctx.json_output {
        print_json(&Outcome { ok: true, action })
    } else {
        let green = Style::new().green();
        println!("{} {}", green.apply_to("✓"), message);
        Ok(())
    }
}
