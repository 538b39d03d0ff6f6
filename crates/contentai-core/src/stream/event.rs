//! Typed events carried by the chat stream.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::session::Source;

/// One line of the chat stream, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A text delta for the assistant's answer.
    Content {
        #[serde(default)]
        content: String,
    },

    /// A research tool started running.
    ToolStart {
        #[serde(default)]
        tool: Option<String>,
        #[serde(default)]
        args: Option<Value>,
    },

    /// The research tool finished with these sources.
    ToolEnd {
        #[serde(default, deserialize_with = "lenient_sources")]
        sources: Option<Vec<Source>>,
    },

    /// The session title became available server-side.
    Title {
        #[serde(default)]
        title: Option<String>,
    },

    /// The server reported a failure mid-stream. The stream may continue.
    Error {
        #[serde(default)]
        error: String,
    },

    /// Any `type` this client doesn't know about.
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Map a decoded JSON value onto an event.
    ///
    /// Values that don't fit the schema (no `type`, wrong field types) are
    /// logged and yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match serde_json::from_value::<StreamEvent>(value.clone()) {
            Ok(event) => Some(event),
            Err(e) => {
                log::warn!("Ignoring unrecognised stream event ({}): {}", e, value);
                None
            }
        }
    }
}

/// Accept whatever the tool returned: keep entries that look like sources,
/// drop the rest. A non-array `sources` counts as absent.
fn lenient_sources<'de, D>(deserializer: D) -> Result<Option<Vec<Source>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<Source>(item).ok())
                .collect(),
        ),
        _ => None,
    })
}
