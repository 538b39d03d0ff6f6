use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use contentai_core::ClientContext;

pub fn login(ctx: &ClientContext, email: &str, password: Option<String>) -> Result<()> {
    let password = password_or_prompt(password)?;
    let credentials = ctx
        .api
        .login(email, &password)
        .context("Login failed")?;

    let who = credentials
        .user
        .as_ref()
        .map(|u| u.name.clone().unwrap_or_else(|| u.email.clone()))
        .unwrap_or_else(|| email.to_string());
    println!("Signed in as {who}");
    Ok(())
}

pub fn register(ctx: &ClientContext, email: &str, password: Option<String>, name: &str) -> Result<()> {
    let password = password_or_prompt(password)?;
    ctx.api
        .register(email, &password, name)
        .context("Registration failed")?;
    println!("Registered {email}. Run `contentai login --email {email}` to sign in.");
    Ok(())
}

pub fn logout(ctx: &ClientContext) -> Result<()> {
    ctx.api.logout()?;
    println!("Signed out");
    Ok(())
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}
