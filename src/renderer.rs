use crate::model::{Content, Conversation, Message, Part, Role};
use crate::utils;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

#[derive(Serialize)]
struct Frontmatter {
    title: String,
    created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
}

fn role_heading(role: Role) -> Option<&'static str> {
    match role {
        Role::User => Some("User"),
        Role::Assistant => Some("Assistant"),
        Role::Tool => Some("Tool"),
        // Hidden: the injected system prompt and roles we don't recognize.
        Role::System | Role::Unknown => None,
    }
}

/// Best-effort rendering of content kinds we don't model structurally.
/// Prefers any embedded text over a placeholder so nothing is silently lost.
fn render_other(value: &Value) -> String {
    if let Some(text) = value.get("text").and_then(Value::as_str) {
        return text.to_string();
    }
    if let Some(parts) = value.get("parts").and_then(Value::as_array) {
        let rendered: Vec<String> = parts
            .iter()
            .map(render_json_part)
            .filter(|p| !p.trim().is_empty())
            .collect();
        if !rendered.is_empty() {
            return rendered.join("\n\n");
        }
    }
    let kind = value
        .get("content_type")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    format!("*[unsupported content: {}]*", kind)
}

fn render_json_part(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => render_other(other),
    }
}

fn render_part(part: &Part) -> String {
    match part {
        Part::Text(s) => s.clone(),
        Part::Other(v) => render_other(v),
    }
}

fn render_content(content: &Content) -> String {
    match content {
        Content::Text { parts } => {
            let rendered: Vec<String> = parts
                .iter()
                .map(render_part)
                .filter(|p| !p.trim().is_empty())
                .collect();
            rendered.join("\n\n")
        }
        Content::Code { language, text } => {
            let lang = language.as_deref().unwrap_or("");
            format!("```{}\n{}\n```", lang, text)
        }
        Content::Other(value) => render_other(value),
    }
}

/// The single renderability policy: a message produces a block iff its role
/// maps to a heading and its content renders non-blank.
pub fn render_message(msg: &Message) -> Option<String> {
    let heading = role_heading(msg.author.role)?;
    let body = render_content(&msg.content);
    if body.trim().is_empty() {
        return None;
    }
    Some(format!("## {}\n\n{}", heading, body))
}

/// Rendered blocks for every renderable message, in conversation order.
pub fn message_blocks(convo: &Conversation) -> Vec<String> {
    convo
        .ordered_nodes()
        .into_iter()
        .filter_map(|node| node.message.as_ref())
        .filter_map(render_message)
        .collect()
}

/// Write the full Markdown document: YAML frontmatter, title heading, then
/// the message blocks separated by blank lines.
pub fn render_conversation<W: Write>(
    writer: &mut W,
    convo: &Conversation,
    blocks: &[String],
    tags: Option<&[String]>,
) -> std::io::Result<()> {
    let fm = Frontmatter {
        title: convo.display_title().to_string(),
        created: utils::datetime_from_epoch(convo.create_time),
        tags: tags.map(|t| t.to_vec()),
    };

    writeln!(writer, "---")?;
    let yaml =
        serde_yaml::to_string(&fm).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    write!(writer, "{}", yaml)?;
    writeln!(writer, "---")?;
    writeln!(writer)?;

    writeln!(writer, "# {}", convo.display_title())?;

    for block in blocks {
        writeln!(writer)?;
        writeln!(writer, "{}", block)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Conversation;
    use serde_json::json;

    fn render_full(convo: &Conversation) -> String {
        let blocks = message_blocks(convo);
        let mut out = Vec::new();
        render_conversation(&mut out, convo, &blocks, None).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn single_user_message() {
        let convo: Conversation = serde_json::from_value(json!({
            "title": "Test Chat",
            "create_time": 1700000000,
            "mapping": {
                "root": {"id": "root", "parent": null, "children": ["m1"]},
                "m1": {
                    "id": "m1", "parent": "root", "children": [],
                    "message": {
                        "author": {"role": "user"},
                        "content": {"content_type": "text", "parts": ["Hello"]},
                        "create_time": 1700000001
                    }
                }
            }
        }))
        .unwrap();

        let doc = render_full(&convo);
        assert!(doc.starts_with("---\n"));
        assert!(doc.contains("title: Test Chat"));
        assert!(doc.contains("# Test Chat"));
        let user_pos = doc.find("## User").unwrap();
        let hello_pos = doc.find("Hello").unwrap();
        assert!(user_pos < hello_pos);
    }

    #[test]
    fn system_and_unknown_roles_are_hidden() {
        for role in ["system", "weird_internal_role"] {
            let msg = serde_json::from_value(json!({
                "author": {"role": role},
                "content": {"content_type": "text", "parts": ["secret"]}
            }))
            .unwrap();
            assert!(render_message(&msg).is_none());
        }
    }

    #[test]
    fn blank_parts_are_not_renderable() {
        let msg = serde_json::from_value(json!({
            "author": {"role": "user"},
            "content": {"content_type": "text", "parts": [""]}
        }))
        .unwrap();
        assert!(render_message(&msg).is_none());
    }

    #[test]
    fn code_content_is_fenced() {
        let msg = serde_json::from_value(json!({
            "author": {"role": "assistant"},
            "content": {"content_type": "code", "language": "python", "text": "print(1)"}
        }))
        .unwrap();
        let block = render_message(&msg).unwrap();
        assert!(block.contains("```python\nprint(1)\n```"));

        let msg = serde_json::from_value(json!({
            "author": {"role": "assistant"},
            "content": {"content_type": "code", "text": "x = 1"}
        }))
        .unwrap();
        let block = render_message(&msg).unwrap();
        assert!(block.contains("```\nx = 1\n```"));
    }

    #[test]
    fn text_parts_become_paragraphs() {
        let msg = serde_json::from_value(json!({
            "author": {"role": "assistant"},
            "content": {"content_type": "text", "parts": ["one", "", "two"]}
        }))
        .unwrap();
        let block = render_message(&msg).unwrap();
        assert!(block.ends_with("one\n\ntwo"));
    }

    #[test]
    fn unknown_content_is_kept_best_effort() {
        // Embedded text wins over the placeholder.
        let msg = serde_json::from_value(json!({
            "author": {"role": "tool"},
            "content": {"content_type": "execution_output", "text": "42"}
        }))
        .unwrap();
        assert!(render_message(&msg).unwrap().contains("42"));

        // No text anywhere: explicit marker, never dropped.
        let msg = serde_json::from_value(json!({
            "author": {"role": "user"},
            "content": {"content_type": "multimodal_text",
                        "parts": [{"content_type": "image_asset_pointer", "asset_pointer": "file-x"}]}
        }))
        .unwrap();
        let block = render_message(&msg).unwrap();
        assert!(block.contains("*[unsupported content: image_asset_pointer]*"));
    }

    #[test]
    fn tags_land_in_frontmatter() {
        let convo: Conversation =
            serde_json::from_value(json!({"title": "T", "mapping": {}})).unwrap();
        let mut out = Vec::new();
        render_conversation(&mut out, &convo, &[], Some(&["chatgpt".to_string()])).unwrap();
        let doc = String::from_utf8(out).unwrap();
        assert!(doc.contains("tags:"));
        assert!(doc.contains("chatgpt"));
    }
}
