use serde::{Deserialize, Serialize};

/// A transcript longer than this gets cut back to the system message plus
/// the most recent [`KEEP_RECENT`] entries after a completed turn.
pub const MAX_TRANSCRIPT_LEN: usize = 20;
pub const KEEP_RECENT: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry in a conversation transcript. Immutable once created;
/// ordering within a transcript is chronological.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered conversation context sent upstream. Invariant: index 0 is always
/// the system message, so a transcript is never empty.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn seeded(system_prompt: &str) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Rolling context window: once the transcript exceeds
    /// [`MAX_TRANSCRIPT_LEN`] entries, keep the system message plus the
    /// last [`KEEP_RECENT`]. Must only run between turns, never while a
    /// completion is in flight.
    pub fn truncate_window(&mut self) {
        if self.messages.len() > MAX_TRANSCRIPT_LEN {
            let tail_start = self.messages.len() - KEEP_RECENT;
            let mut kept = Vec::with_capacity(KEEP_RECENT + 1);
            kept.push(self.messages[0].clone());
            kept.extend_from_slice(&self.messages[tail_start..]);
            self.messages = kept;
        }
    }
}

/// Inbound payload shape shared by both transports. `key`, when present,
/// overrides the configured credential for that call only.
#[derive(Debug, Default, Deserialize)]
pub struct Inbound {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub key: Option<String>,
}

impl Inbound {
    /// Parse a raw frame, degrading gracefully: anything that does not
    /// deserialize as the JSON payload shape is treated as plain text.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| Self {
            text: raw.to_string(),
            key: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Status,
    Delta,
    Final,
}

/// WebSocket outbound wire shape:
/// `{"role":"assistant","type":"status"|"delta"|"final","content":...}`.
#[derive(Debug, Serialize)]
pub struct AssistantEvent {
    pub role: Role,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub content: String,
}

impl AssistantEvent {
    pub fn status(content: impl Into<String>) -> Self {
        Self::new(EventKind::Status, content)
    }

    pub fn delta(content: impl Into<String>) -> Self {
        Self::new(EventKind::Delta, content)
    }

    pub fn final_reply(content: impl Into<String>) -> Self {
        Self::new(EventKind::Final, content)
    }

    fn new(kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            kind,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_transcript_starts_with_system() {
        let t = Transcript::seeded("be helpful");
        assert_eq!(t.len(), 1);
        assert_eq!(t.messages()[0].role, Role::System);
        assert!(!t.is_empty());
    }

    #[test]
    fn truncate_window_is_noop_at_or_under_limit() {
        let mut t = Transcript::seeded("sys");
        for i in 0..19 {
            t.push(ChatMessage::user(format!("m{i}")));
        }
        assert_eq!(t.len(), 20);
        t.truncate_window();
        assert_eq!(t.len(), 20);
    }

    #[test]
    fn truncate_window_keeps_system_plus_recent_tail() {
        let mut t = Transcript::seeded("sys");
        for i in 0..24 {
            t.push(ChatMessage::user(format!("m{i}")));
        }
        assert_eq!(t.len(), 25);
        t.truncate_window();
        assert_eq!(t.len(), 19);
        assert_eq!(t.messages()[0].role, Role::System);
        assert_eq!(t.messages()[0].content, "sys");
        // Last 18 of the original 24 user messages survive.
        assert_eq!(t.messages()[1].content, "m6");
        assert_eq!(t.messages()[18].content, "m23");
    }

    #[test]
    fn inbound_parses_json_payload() {
        let p = Inbound::parse(r#"{"text":"你好","key":"sk-test"}"#);
        assert_eq!(p.text, "你好");
        assert_eq!(p.key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn inbound_falls_back_to_plain_text() {
        let p = Inbound::parse("这不是 JSON");
        assert_eq!(p.text, "这不是 JSON");
        assert!(p.key.is_none());
    }

    #[test]
    fn inbound_json_without_text_defaults_empty() {
        let p = Inbound::parse(r#"{"key":"sk-test"}"#);
        assert_eq!(p.text, "");
        assert_eq!(p.key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn assistant_event_wire_shape() {
        let json = serde_json::to_value(AssistantEvent::delta("片段"))
            .expect("event should serialize");
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["type"], "delta");
        assert_eq!(json["content"], "片段");
    }
}
