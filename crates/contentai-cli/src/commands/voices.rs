use anyhow::{Context, Result};
use contentai_core::ClientContext;

use super::require_user;

pub fn list(ctx: &ClientContext) -> Result<()> {
    let user_id = require_user(ctx)?;
    let voices = ctx
        .api
        .list_brand_voices(&user_id)
        .context("Failed to load brand voices")?;

    if voices.is_empty() {
        println!("No brand voices");
    }
    for voice in voices {
        match voice.description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => println!("{}  {} - {}", voice.id, voice.name, description),
            None => println!("{}  {}", voice.id, voice.name),
        }
    }
    Ok(())
}
