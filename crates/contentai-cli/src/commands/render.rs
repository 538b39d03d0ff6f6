//! Plain-text rendering of controller state.

use contentai_core::session::Message;
use contentai_core::{Role, SessionSummary};

pub fn render_session(session: &SessionSummary) -> String {
    let title = session
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("(untitled)");
    format!("{}  {}", session.session_id, title)
}

pub fn role_prompt(role: Role) -> &'static str {
    match role {
        Role::User => "you>",
        Role::Assistant => "assistant>",
    }
}

/// A message with its attachments and cited sources.
pub fn render_message(message: &Message) -> String {
    let mut out = format!("{} {}", role_prompt(message.role), message.content);
    for attachment in &message.attachments {
        out.push_str(&format!("\n  [attached] {} ({})", attachment.name, attachment.mime_type));
    }
    out.push_str(&render_sources(message));
    out
}

/// Numbered source list, or an empty string when nothing was cited.
pub fn render_sources(message: &Message) -> String {
    let Some(research) = message.research.as_ref() else {
        return String::new();
    };
    let mut out = String::new();
    for (i, source) in research.sources.iter().enumerate() {
        match source.title.as_deref() {
            Some(title) => out.push_str(&format!("\n  [{}] {} - {}", i + 1, title, source.url)),
            None => out.push_str(&format!("\n  [{}] {}", i + 1, source.url)),
        }
    }
    out
}
