use anyhow::{Context, Result};
use contentai_core::{ClientContext, SessionId};

use super::render::{render_message, render_session};
use super::require_user;

pub fn list(ctx: &ClientContext) -> Result<()> {
    require_user(ctx)?;
    let controller = ctx.chat_controller();
    controller
        .load_sessions()
        .context("Failed to load sessions")?;

    let sessions = controller.sessions();
    if sessions.is_empty() {
        println!("No sessions yet");
    }
    for session in &sessions {
        println!("{}", render_session(session));
    }
    Ok(())
}

pub fn history(ctx: &ClientContext, session_id: &str) -> Result<()> {
    let controller = ctx.chat_controller();
    controller
        .switch_session(SessionId::from(session_id))
        .with_context(|| format!("Failed to load history for {session_id}"))?;

    for message in controller.messages() {
        println!("{}\n", render_message(&message));
    }
    Ok(())
}

pub fn delete(ctx: &ClientContext, session_id: &str) -> Result<()> {
    let controller = ctx.chat_controller();
    controller
        .delete_session(&SessionId::from(session_id))
        .with_context(|| format!("Failed to delete {session_id}"))?;
    println!("Deleted {session_id}");
    Ok(())
}
