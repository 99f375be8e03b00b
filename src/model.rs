//! Type definitions for the ChatGPT data-export schema.
//!
//! A ChatGPT export archive contains `conversations.json`: a JSON array of
//! conversation records. Each record carries a flat `mapping` of node id →
//! node, encoding the message tree as an arena. Nodes reference their parent
//! and an ordered list of children; the content-bearing `message` is optional
//! (the invisible root and some tool plumbing nodes have none).
//!
//! Insertion order of `mapping` is whatever the exporter happened to emit and
//! is *not* chronological; conversation order is recovered by walking child
//! links from the root (see [`Conversation::ordered_nodes`]).

use std::collections::{HashMap, HashSet};

use eyre::{Result, eyre};
use serde::Deserialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Conversation turn role. Exports also contain internal roles we do not
/// recognize; those fall through to `Unknown` rather than failing the parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    #[serde(other)]
    Unknown,
}

/// The `author` object attached to a message.
#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    #[serde(default = "unknown_role")]
    pub role: Role,
}

fn unknown_role() -> Role {
    Role::Unknown
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// One entry of a `parts` array. Usually a plain string; multimodal
/// conversations carry objects (image asset pointers etc.) instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text(String),
    Other(Value),
}

/// Message content, dispatched on the `content_type` tag.
///
/// Only `text` and `code` are modeled structurally. Every other kind
/// (`tether_quote`, `execution_output`, `multimodal_text`, …) is kept as the
/// raw JSON value so the renderer can still surface it best-effort instead of
/// losing it.
#[derive(Debug, Clone)]
pub enum Content {
    Text { parts: Vec<Part> },
    Code { language: Option<String>, text: String },
    Other(Value),
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let value = Value::deserialize(deserializer)?;
        match value.get("content_type").and_then(Value::as_str) {
            Some("text") => {
                let parts = match value.get("parts") {
                    Some(parts) => serde_json::from_value(parts.clone()).map_err(Error::custom)?,
                    None => Vec::new(),
                };
                Ok(Self::Text { parts })
            }
            Some("code") => Ok(Self::Code {
                language: value
                    .get("language")
                    .and_then(Value::as_str)
                    .filter(|l| !l.is_empty())
                    .map(str::to_owned),
                text: value
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            }),
            _ => Ok(Self::Other(value)),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages and nodes
// ---------------------------------------------------------------------------

/// The content-bearing payload of a tree node.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub author: Author,
    pub content: Content,
    #[serde(default)]
    pub create_time: Option<f64>,
}

/// One entry in a conversation's message tree.
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

/// One exported chat session.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub title: Option<String>,
    /// Creation time as fractional epoch seconds.
    #[serde(default)]
    pub create_time: Option<f64>,
    #[serde(default)]
    pub mapping: HashMap<String, Node>,
}

impl Conversation {
    /// Display title, falling back to a placeholder for untitled chats.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => "Untitled",
        }
    }

    /// The id of the tree root: the node whose parent is null.
    ///
    /// Some exports lack an explicit root; fall back to the node carrying the
    /// earliest message so the walk still starts at the chronological front.
    fn root_id(&self) -> Option<&str> {
        if let Some((id, _)) = self.mapping.iter().find(|(_, n)| n.parent.is_none()) {
            return Some(id);
        }
        self.mapping
            .iter()
            .filter_map(|(id, n)| {
                let t = n.message.as_ref()?.create_time?;
                Some((id, t))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id.as_str())
    }

    /// Nodes in conversation order: a depth-first walk from the root,
    /// following each node's ordered child list. Child lists put the active
    /// thread first, so regenerated branches come after the branch point's
    /// main continuation.
    ///
    /// Ids pointing outside the mapping are ignored, and a visited set guards
    /// against cycles in corrupt exports.
    pub fn ordered_nodes(&self) -> Vec<&Node> {
        let Some(root) = self.root_id() else {
            return Vec::new();
        };

        let mut ordered = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.mapping.get(id) else {
                continue;
            };
            ordered.push(node);
            for child in node.children.iter().rev() {
                stack.push(child.as_str());
            }
        }
        ordered
    }
}

/// Extract the conversation array from a parsed export document.
///
/// Accepts either a bare top-level array or an object wrapping one under a
/// `conversations` key. Individual records that fail to deserialize are
/// returned as `Err` entries so the caller can warn and move on instead of
/// aborting the whole run.
pub fn conversations_from(doc: Value) -> Result<Vec<Result<Conversation>>> {
    let records = match doc {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("conversations") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(eyre!(
                    "Expected a JSON array of conversations (or an object with a `conversations` array)"
                ));
            }
        },
        _ => {
            return Err(eyre!(
                "Expected a JSON array of conversations (or an object with a `conversations` array)"
            ));
        }
    };

    Ok(records
        .into_iter()
        .map(|record| {
            serde_json::from_value::<Conversation>(record)
                .map_err(|e| eyre!("Malformed conversation record: {}", e))
        })
        .collect())
}
