//! Terminal rendering of conversation messages.
//!
//! Long assistant answers are collapsed on screen until the user asks
//! for more. Collapsing only affects what is printed; the stored
//! `Message` is never modified.

use std::collections::HashSet;

use chrono::Local;

use super::conversation::{Message, MessageId, Sender};
use crate::assistant::format::truncate;

/// Default display collapse threshold, in chars.
pub const DEFAULT_COLLAPSE_THRESHOLD: usize = 1000;

/// Which collapsible messages the user has expanded.
#[derive(Debug, Default)]
pub struct ExpandedMessages {
    ids: HashSet<MessageId>,
}

impl ExpandedMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the state for `id` and returns the new one.
    pub fn toggle(&mut self, id: MessageId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn is_expanded(&self, id: MessageId) -> bool {
        self.ids.contains(&id)
    }
}

/// Text to print for one message body.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayText {
    pub text: String,
    /// Longer than the threshold, so a show more/less control applies
    pub collapsible: bool,
}

pub fn collapse_for_display(content: &str, threshold: usize, expanded: bool) -> DisplayText {
    let collapsible = content.chars().count() > threshold;
    let text = if collapsible && !expanded {
        truncate(content, threshold)
    } else {
        content.to_string()
    };
    DisplayText { text, collapsible }
}

/// Renders a message as printable lines: a header, then the body.
pub fn render_message(message: &Message, expanded: &ExpandedMessages, threshold: usize) -> String {
    let who = match message.sender {
        Sender::User => "You",
        Sender::Assistant => "Assistant",
    };
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let header = format!("[{time}] {who} #{}:", message.id);

    if message.pending {
        return format!("{header}\n  thinking…");
    }

    if message.sender == Sender::User {
        return format!("{header}\n{}", message.content);
    }

    let is_expanded = expanded.is_expanded(message.id);
    let body = collapse_for_display(&message.content, threshold, is_expanded);
    match (body.collapsible, is_expanded) {
        (true, false) => format!(
            "{header}\n{}\n[show more: /more {}]",
            body.text, message.id
        ),
        (true, true) => format!(
            "{header}\n{}\n[show less: /more {}]",
            body.text, message.id
        ),
        _ => format!("{header}\n{}", body.text),
    }
}
