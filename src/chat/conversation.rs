use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::assistant::CompletionClient;

/// Identifier of a message within one conversation. Monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Content is not final yet (a completion is in flight)
    pub pending: bool,
}

/// Handle for a turn whose completion has not resolved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTurn {
    pub placeholder_id: MessageId,
    pub question: String,
}

/// Ordered, in-memory message list of one chat session.
///
/// Messages are only ever appended; the single in-place change is the
/// resolution of a pending assistant placeholder.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a conversation with a (non-pending) assistant greeting.
    pub fn with_welcome(text: &str) -> Self {
        let mut conversation = Self::new();
        conversation.push(Sender::Assistant, text.to_string(), false);
        conversation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// True while any assistant message is waiting for its completion.
    pub fn is_busy(&self) -> bool {
        self.messages.iter().any(|m| m.pending)
    }

    /// True until the user has asked anything.
    pub fn is_fresh(&self) -> bool {
        self.messages.iter().all(|m| m.sender == Sender::Assistant)
    }

    fn push(&mut self, sender: Sender, content: String, pending: bool) -> MessageId {
        self.next_id += 1;
        let id = MessageId(self.next_id);
        self.messages.push(Message {
            id,
            sender,
            content,
            timestamp: Utc::now(),
            pending,
        });
        id
    }

    /// Appends the user's message and an empty pending placeholder.
    ///
    /// Blank input is ignored and returns `None`.
    pub fn begin_turn(&mut self, text: &str) -> Option<PendingTurn> {
        if text.trim().is_empty() {
            return None;
        }

        self.push(Sender::User, text.to_string(), false);
        let placeholder_id = self.push(Sender::Assistant, String::new(), true);
        debug!("Turn started, placeholder {placeholder_id}");

        Some(PendingTurn {
            placeholder_id,
            question: text.to_string(),
        })
    }

    /// Replaces the placeholder's content and clears `pending`.
    ///
    /// Returns false (and changes nothing) if no assistant message has
    /// that id.
    pub fn resolve(&mut self, id: MessageId, content: String) -> bool {
        let Some(message) = self
            .messages
            .iter_mut()
            .find(|m| m.id == id && m.sender == Sender::Assistant)
        else {
            warn!("No assistant message {id} to resolve, dropping completion");
            return false;
        };

        message.content = content;
        message.pending = false;
        true
    }

    /// Runs one full turn: append, ask, resolve.
    ///
    /// Failures end up as the assistant message's content. Returns the
    /// id of the resolved assistant message, or `None` for blank input.
    pub async fn submit(&mut self, text: &str, client: &CompletionClient) -> Option<MessageId> {
        let turn = self.begin_turn(text)?;

        let content = match client.complete(&turn.question).await {
            Ok(answer) => answer,
            Err(failure) => failure.message,
        };

        self.resolve(turn.placeholder_id, content);
        Some(turn.placeholder_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::completion::canned_answer;
    use crate::config::AssistantConfig;
    use crate::llm::testing::ScriptedLlm;
    use crate::llm::RemoteError;

    fn client(llm: ScriptedLlm) -> CompletionClient {
        CompletionClient::new(Box::new(llm), &AssistantConfig::default())
    }

    fn pending_count(conversation: &Conversation) -> usize {
        conversation.messages().iter().filter(|m| m.pending).count()
    }

    // ── begin_turn / resolve ─────────────────────────────

    #[test]
    fn test_begin_turn_appends_user_and_placeholder() {
        let mut conversation = Conversation::new();
        let turn = conversation.begin_turn("What is a qubit?").unwrap();

        let messages = conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].content, "What is a qubit?");
        assert!(!messages[0].pending);
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert_eq!(messages[1].id, turn.placeholder_id);
        assert!(messages[1].content.is_empty());
        assert!(messages[1].pending);
        assert_eq!(turn.question, "What is a qubit?");
    }

    #[test]
    fn test_single_pending_between_begin_and_resolve() {
        let mut conversation = Conversation::with_welcome("Welcome!");
        let turn = conversation.begin_turn("hello").unwrap();
        assert_eq!(pending_count(&conversation), 1);
        assert!(conversation.is_busy());

        assert!(conversation.resolve(turn.placeholder_id, "Hi!".to_string()));
        assert_eq!(pending_count(&conversation), 0);
        assert!(!conversation.is_busy());
    }

    #[test]
    fn test_begin_turn_rejects_blank() {
        let mut conversation = Conversation::new();
        assert!(conversation.begin_turn("").is_none());
        assert!(conversation.begin_turn(" \t\n ").is_none());
        assert!(conversation.messages().is_empty());
    }

    #[test]
    fn test_resolve_unknown_id_is_noop() {
        let mut conversation = Conversation::new();
        conversation.begin_turn("hello").unwrap();
        let before = conversation.messages().to_vec();

        assert!(!conversation.resolve(MessageId(999), "lost".to_string()));
        assert_eq!(conversation.messages(), before.as_slice());
    }

    #[test]
    fn test_resolve_does_not_touch_user_messages() {
        let mut conversation = Conversation::new();
        conversation.begin_turn("hello").unwrap();
        let user_id = conversation.messages()[0].id;

        assert!(!conversation.resolve(user_id, "rewritten".to_string()));
        assert_eq!(conversation.messages()[0].content, "hello");
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut conversation = Conversation::with_welcome("Welcome!");
        conversation.begin_turn("one").unwrap();
        conversation.begin_turn("two").unwrap();
        let ids: Vec<u64> = conversation.messages().iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_with_welcome_is_fresh_and_idle() {
        let conversation = Conversation::with_welcome("Welcome!");
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].sender, Sender::Assistant);
        assert!(conversation.is_fresh());
        assert!(!conversation.is_busy());
    }

    // ── submit ───────────────────────────────────────────

    #[tokio::test]
    async fn test_submit_blank_makes_no_call() {
        let (llm, prompts) = ScriptedLlm::answering("unused");
        let client = client(llm);
        let mut conversation = Conversation::new();

        assert!(conversation.submit("", &client).await.is_none());
        assert!(conversation.submit("   ", &client).await.is_none());
        assert!(conversation.messages().is_empty());
        assert!(prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_success_replaces_placeholder() {
        let (llm, _) = ScriptedLlm::answering("## Superposition\nA qubit can be 0 and 1.");
        let client = client(llm);
        let mut conversation = Conversation::with_welcome("Welcome!");

        let id = conversation
            .submit("What is superposition?", &client)
            .await
            .unwrap();

        assert_eq!(conversation.messages().len(), 3);
        let answer = conversation.get(id).unwrap();
        assert_eq!(answer.sender, Sender::Assistant);
        assert_eq!(answer.content, "## Superposition\n\nA qubit can be 0 and 1.");
        assert!(!answer.pending);
        assert!(!conversation.is_fresh());
    }

    #[tokio::test]
    async fn test_submit_hello_with_network_failure_uses_greeting() {
        let (llm, _) =
            ScriptedLlm::failing(RemoteError::Transport("connection reset".to_string()));
        let client = client(llm);
        let mut conversation = Conversation::new();

        let id = conversation.submit("hello", &client).await.unwrap();
        let answer = conversation.get(id).unwrap();
        assert_eq!(answer.content, canned_answer("hello").unwrap());
        assert!(!answer.pending);
    }

    #[tokio::test]
    async fn test_submit_failure_becomes_content() {
        let (llm, _) = ScriptedLlm::failing(RemoteError::Api {
            status: 429,
            message: "Quota exceeded for metric".to_string(),
        });
        let client = client(llm);
        let mut conversation = Conversation::new();

        let id = conversation.submit("What is a qubit?", &client).await.unwrap();
        let answer = conversation.get(id).unwrap();
        assert!(answer.content.contains("API quota might be exceeded"));
        assert!(!answer.pending);
    }

    #[tokio::test]
    async fn test_submit_passes_raw_text_to_client() {
        let (llm, prompts) = ScriptedLlm::answering("ok");
        let client = client(llm);
        let mut conversation = Conversation::new();

        conversation.submit("  spaced question  ", &client).await.unwrap();
        assert_eq!(conversation.messages()[0].content, "  spaced question  ");
        assert!(prompts.lock().unwrap()[0].ends_with("Question:   spaced question  "));
    }
}
