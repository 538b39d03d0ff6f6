//! Chat messages and their research sub-state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stream::StreamEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A file the user attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    /// MIME type, e.g. `image/png`.
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            url: None,
        }
    }
}

/// A search result cited by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Source {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
        }
    }
}

/// Whether the assistant ran a research tool for this message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Research {
    pub has_searched: bool,
    pub is_searching: bool,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Structured mirror of an assistant message's content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<Research>,
    #[serde(default)]
    pub is_loading: bool,
}

impl Message {
    /// A fully populated user message. Never mutated after it is pushed.
    pub fn user(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: new_message_id(),
            role: Role::User,
            content: content.into(),
            answer: None,
            attachments,
            research: None,
            is_loading: false,
        }
    }

    /// The empty, loading assistant message that a stream fills in.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: new_message_id(),
            role: Role::Assistant,
            content: String::new(),
            answer: Some(Answer::default()),
            attachments: Vec::new(),
            research: Some(Research::default()),
            is_loading: true,
        }
    }

    /// Append a text delta to both `content` and `answer.content`.
    pub fn append_content(&mut self, delta: &str) {
        self.content.push_str(delta);
        match self.answer.as_mut() {
            Some(answer) => answer.content.push_str(delta),
            None => {
                self.answer = Some(Answer {
                    content: self.content.clone(),
                })
            }
        }
    }

    pub fn research_mut(&mut self) -> &mut Research {
        self.research.get_or_insert_with(Research::default)
    }

    /// Apply one decoded stream event.
    ///
    /// Returns `true` if the message changed. `title`, `error` and unknown
    /// events never touch the message.
    pub fn apply(&mut self, event: &StreamEvent) -> bool {
        match event {
            StreamEvent::Content { content } => {
                self.append_content(content);
                true
            }
            StreamEvent::ToolStart { .. } => {
                let research = self.research_mut();
                research.has_searched = true;
                research.is_searching = true;
                true
            }
            StreamEvent::ToolEnd { sources } => {
                let research = self.research_mut();
                research.is_searching = false;
                research.sources = sources.clone().unwrap_or_default();
                true
            }
            StreamEvent::Title { .. } | StreamEvent::Error { .. } | StreamEvent::Unknown => false,
        }
    }
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}
