//! Transcript inspection and cleanup ahead of summarization.
//!
//! User messages carry the active selection inline as
//! `[Model: <id>]\n\n[Provider: <name>]\n\n<text>`. Assistant messages may
//! contain reasoning blocks and artifact/action markup that the chat UI
//! executes; none of it is useful to a summarizer.

use chrono::Utc;

use crate::models::{ChatSummary, ConversationMessage, MessageAnnotation, Role};

const MODEL_TAG: &str = "[Model: ";
const PROVIDER_TAG: &str = "[Provider: ";
const TAG_END: &str = "]\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageProperties {
    pub model: Option<String>,
    pub provider: Option<String>,
    pub content: String,
}

/// Split the inline model/provider tags off a user message.
pub fn extract_properties(text: &str) -> MessageProperties {
    let mut rest = text;
    let mut model = None;
    let mut provider = None;
    let (mut seen_model, mut seen_provider) = (false, false);

    // Each tag is consumed at most once, in either order. An empty value
    // still consumes its tag but yields no selection.
    loop {
        if !seen_model {
            if let Some((value, after)) = take_tag(rest, MODEL_TAG) {
                seen_model = true;
                model = Some(value).filter(|v| !v.is_empty());
                rest = after;
                continue;
            }
        }
        if !seen_provider {
            if let Some((value, after)) = take_tag(rest, PROVIDER_TAG) {
                seen_provider = true;
                provider = Some(value).filter(|v| !v.is_empty());
                rest = after;
                continue;
            }
        }
        break;
    }

    MessageProperties {
        model,
        provider,
        content: rest.to_string(),
    }
}

fn take_tag<'a>(text: &'a str, prefix: &str) -> Option<(String, &'a str)> {
    let body = text.strip_prefix(prefix)?;
    let end = body.find(TAG_END)?;
    let value = &body[..end];
    if value.contains('\n') {
        return None;
    }
    Some((value.trim().to_string(), &body[end + TAG_END.len()..]))
}

/// Prefix the active selection onto outgoing user text.
pub fn annotate_user_text(model: &str, provider: &str, text: &str) -> String {
    format!(
        "{}{}{}{}{}{}{}",
        MODEL_TAG, model, TAG_END, PROVIDER_TAG, provider, TAG_END, text
    )
}

/// Provider and model named by the most recent user message, if any.
pub fn last_selection(transcript: &[ConversationMessage]) -> (Option<String>, Option<String>) {
    transcript
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| {
            let props = extract_properties(&m.text());
            (props.provider, props.model)
        })
        .unwrap_or((None, None))
}

/// The newest summary annotation stored on an assistant message.
pub fn latest_summary(transcript: &[ConversationMessage]) -> Option<ChatSummary> {
    transcript
        .iter()
        .rev()
        .filter(|m| m.role == Role::Assistant)
        .find_map(|m| {
            m.annotations.iter().rev().find_map(|a| match a {
                MessageAnnotation::ChatSummary { chat_id, summary } => Some(ChatSummary {
                    chat_id: chat_id.clone(),
                    summary_text: summary.clone(),
                    created_at: m.created_at.unwrap_or_else(Utc::now),
                }),
                _ => None,
            })
        })
}

/// Messages strictly after `boundary_id`. When the id is not present the
/// whole transcript is returned.
pub fn messages_after<'a>(
    transcript: &'a [ConversationMessage],
    boundary_id: &str,
) -> &'a [ConversationMessage] {
    match transcript.iter().position(|m| m.id == boundary_id) {
        Some(index) => &transcript[index + 1..],
        None => transcript,
    }
}

/// Text of a message as the summarizer should see it.
pub fn sanitize(message: &ConversationMessage) -> String {
    let text = message.text();
    match message.role {
        Role::User => extract_properties(&text).content,
        Role::Assistant => simplify_actions(&strip_thoughts(&text)).trim().to_string(),
        Role::System => text,
    }
}

/// Drop `<think>` blocks and `__boltThought__` divs.
pub fn strip_thoughts(text: &str) -> String {
    let text = replace_tagged_blocks(text, "<think>", "</think>", |_| String::new());
    let text = replace_tagged_blocks(&text, "<div class=\"__boltThought__\"", "</div>", |_| {
        String::new()
    });
    replace_tagged_blocks(&text, "<div class=\\\"__boltThought__\\\"", "</div>", |_| {
        String::new()
    })
}

/// Replace artifact and action markup with a one-line account of what it did.
pub fn simplify_actions(text: &str) -> String {
    let text = replace_tagged_blocks(text, "<boltArtifact", "</boltArtifact>", |block| {
        ActionCounts::scan(block).describe()
    });
    replace_tagged_blocks(&text, "<boltAction", "</boltAction>", |block| {
        ActionCounts::scan(block).describe()
    })
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ActionCounts {
    file: usize,
    shell: usize,
    other: usize,
}

impl ActionCounts {
    fn scan(block: &str) -> Self {
        let mut counts = Self::default();
        let mut rest = block;
        while let Some(start) = rest.find("<boltAction") {
            let tag_end = rest[start..].find('>').map(|i| start + i + 1).unwrap_or(rest.len());
            let tag = &rest[start..tag_end];
            match attribute(tag, "type") {
                Some("file") => counts.file += 1,
                Some("shell") => counts.shell += 1,
                _ => counts.other += 1,
            }
            rest = &rest[tag_end..];
        }
        counts
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.file > 0 {
            parts.push(format!("performed {} file {}", self.file, plural(self.file, "edit")));
        }
        if self.shell > 0 {
            parts.push(format!("ran {} shell {}", self.shell, plural(self.shell, "command")));
        }
        if self.other > 0 {
            parts.push(format!("ran {} other {}", self.other, plural(self.other, "action")));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("[{}]", parts.join(", "))
        }
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{}s", noun)
    }
}

/// Value of `name="..."` inside an opening tag; tolerates JSON-escaped quotes.
fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    for quote in ["=\"", "=\\\""] {
        let needle = format!("{}{}", name, quote);
        if let Some(pos) = tag.find(&needle) {
            let value = &tag[pos + needle.len()..];
            let end = value.find(['"', '\\']).unwrap_or(value.len());
            return Some(&value[..end]);
        }
    }
    None
}

/// Replace each `open ... close` block with `replace(block)`. Self-closing
/// opening tags (`<tag ... />`) are a block on their own. An unterminated
/// block is left untouched.
fn replace_tagged_blocks<F>(text: &str, open: &str, close: &str, mut replace: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(open) {
        let Some(tag_len) = rest[start..].find('>') else {
            break;
        };
        let tag_end = start + tag_len + 1;

        let end = if rest[start..tag_end].ends_with("/>") {
            tag_end
        } else {
            match rest[tag_end..].find(close) {
                Some(i) => tag_end + i + close.len(),
                None => break,
            }
        };

        out.push_str(&rest[..start]);
        out.push_str(&replace(&rest[start..end]));
        rest = &rest[end..];
    }

    out.push_str(rest);
    out
}
