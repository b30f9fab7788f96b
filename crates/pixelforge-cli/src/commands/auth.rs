//! Authentication commands.

use super::{prompt_line, Context};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use pixelforge_session::{SessionPhase, User};

fn display_name(user: &User) -> &str {
    user.username.as_deref().unwrap_or(&user.email)
}

/// Login with email and password.
pub async fn login(ctx: &Context) -> Result<()> {
    let format = &ctx.format;

    let email = prompt_line("Email")?;
    if email.is_empty() {
        anyhow::bail!("Email is required");
    }

    // Prompt for password (hidden)
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }

    if *format == OutputFormat::Text {
        println!("Logging in...");
    }

    sign_in(ctx, &email, &password).await
}

async fn sign_in(ctx: &Context, email: &str, password: &str) -> Result<()> {
    match ctx.store.login(email, password).await {
        Ok(user) => {
            output::print_success(&format!("Logged in as {}", display_name(&user)), &ctx.format);
            Ok(())
        }
        Err(e) => anyhow::bail!("Login failed: {}", e),
    }
}

/// Create an account and sign in with it.
pub async fn register(ctx: &Context) -> Result<()> {
    let email = prompt_line("Email")?;
    if email.is_empty() {
        anyhow::bail!("Email is required");
    }

    let username = prompt_line("Username")?;
    if username.is_empty() {
        anyhow::bail!("Username is required");
    }

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if confirm != password {
        anyhow::bail!("Passwords do not match");
    }

    sign_up(ctx, &email, &password, &username).await
}

async fn sign_up(ctx: &Context, email: &str, password: &str, username: &str) -> Result<()> {
    match ctx.store.register(email, password, username).await {
        Ok(user) => {
            output::print_success(
                &format!("Account created. Logged in as {}", display_name(&user)),
                &ctx.format,
            );
            Ok(())
        }
        Err(e) => anyhow::bail!("Registration failed: {}", e),
    }
}

/// Logout and clear session.
pub async fn logout(ctx: &Context) -> Result<()> {
    let was_authenticated = ctx.store.token().is_some();
    ctx.store.logout();

    if was_authenticated {
        output::print_success("Logged out successfully", &ctx.format);
    } else {
        output::print_success("Not logged in", &ctx.format);
    }

    Ok(())
}

/// Check authentication status.
pub async fn status(ctx: &Context) -> Result<()> {
    let session = ctx.store.snapshot();
    let api_url = ctx.store.http().config().base_url.to_string();
    let logged_in = session.phase() == SessionPhase::Authenticated;

    match ctx.format {
        OutputFormat::Text => {
            println!("API:      {}", api_url);
            match &session.user {
                Some(user) if logged_in => {
                    println!("Auth:     logged in");
                    println!("User ID:  {}", user.id);
                    println!("Email:    {}", user.email);
                    if let Some(username) = &user.username {
                        println!("Username: {}", username);
                    }
                }
                _ => println!("Auth:     not logged in"),
            }
        }
        OutputFormat::Json => {
            output::print_json(&serde_json::json!({
                "api_url": api_url,
                "logged_in": logged_in,
                "user": session.user,
            }))?;
        }
    }

    Ok(())
}
