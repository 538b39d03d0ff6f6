pub mod auth;
pub mod chat;
pub mod render;
pub mod sessions;
pub mod voices;

use anyhow::{bail, Result};
use contentai_core::ClientContext;

/// The signed-in user's id, or an error telling them to log in.
pub fn require_user(ctx: &ClientContext) -> Result<String> {
    match ctx.user_id() {
        Some(user_id) if ctx.credentials.is_signed_in() => Ok(user_id),
        _ => bail!("Not signed in. Run `contentai login --email <EMAIL>` first."),
    }
}
