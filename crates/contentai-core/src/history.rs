//! Rebuilding view messages from server-side history.

use crate::api::StoredMessage;
use crate::session::{Answer, Message, Research, Role};

/// Convert stored messages into fully-formed, non-loading view messages.
///
/// Assistant messages get an `answer` mirror and a research state carrying
/// only `has_searched`; sources are not persisted server-side. User messages
/// get neither.
pub fn hydrate(stored: Vec<StoredMessage>) -> Vec<Message> {
    stored.into_iter().map(hydrate_one).collect()
}

fn hydrate_one(stored: StoredMessage) -> Message {
    let (answer, research) = match stored.role {
        Role::Assistant => {
            let has_searched = stored
                .meta
                .as_ref()
                .and_then(|meta| meta.has_searched)
                .unwrap_or(false);
            (
                Some(Answer {
                    content: stored.content.clone(),
                }),
                Some(Research {
                    has_searched,
                    ..Research::default()
                }),
            )
        }
        Role::User => (None, None),
    };

    Message {
        id: stored.id,
        role: stored.role,
        content: stored.content,
        answer,
        attachments: Vec::new(),
        research,
        is_loading: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::HistoryResponse;
    use serde_json::json;

    fn stored(value: serde_json::Value) -> Vec<StoredMessage> {
        serde_json::from_value::<HistoryResponse>(json!({ "history": value }))
            .unwrap()
            .history
    }

    #[test]
    fn assistant_messages_get_answer_and_research() {
        let messages = hydrate(stored(json!([
            {"id": 1, "role": "user", "content": "Draft a tagline"},
            {"id": 2, "role": "assistant", "content": "Fresh ideas daily", "meta": {"hasSearched": true}}
        ])));

        assert_eq!(messages.len(), 2);

        let user = &messages[0];
        assert_eq!(user.id, "1");
        assert!(user.answer.is_none());
        assert!(user.research.is_none());

        let assistant = &messages[1];
        assert_eq!(
            assistant.answer,
            Some(Answer {
                content: "Fresh ideas daily".into()
            })
        );
        let research = assistant.research.as_ref().unwrap();
        assert!(research.has_searched);
        assert!(!research.is_searching);
        assert!(research.sources.is_empty());
    }

    #[test]
    fn missing_meta_means_not_searched() {
        let messages = hydrate(stored(json!([
            {"id": "a", "role": "assistant", "content": "ok"}
        ])));
        assert!(!messages[0].research.as_ref().unwrap().has_searched);
    }

    #[test]
    fn nothing_is_loading() {
        let messages = hydrate(stored(json!([
            {"id": 1, "role": "user", "content": "a"},
            {"id": 2, "role": "assistant", "content": ""}
        ])));
        assert!(messages.iter().all(|m| !m.is_loading));
    }

    #[test]
    fn empty_history() {
        assert!(hydrate(Vec::new()).is_empty());
    }
}
